//! Wiring for one `lab-calc` run: service backend, workspace, inputs,
//! calculation.

use std::fmt;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lab_client::HttpServiceFactory;
use lab_core::service::ServiceRegistry;
use lab_core::{LastCalculationSnapshot, MeasurementService, MethodId};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::csv_loader::{self, InputRow};
use crate::presentation::ResultView;
use crate::workspace::Workspace;

/// Registry with every backend this binary ships.
pub fn build_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register(Box::new(HttpServiceFactory));
    registry
}

/// What to calculate in one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub sample_id: i64,
    /// Defaults to the first available method.
    pub method_id: Option<MethodId>,
    pub inputs: Vec<InputRow>,
    pub activity_date: Option<NaiveDate>,
    /// Methods the surrounding page reports as finalized.
    pub locked: Vec<MethodId>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub view: ResultView,
    pub snapshot: LastCalculationSnapshot,
}

impl fmt::Display for RunReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.view)?;
        let snapshot = serde_json::to_string_pretty(&self.snapshot).map_err(|_| fmt::Error)?;
        writeln!(f, "Данные для сохранения:")?;
        writeln!(f, "{snapshot}")
    }
}

/// Opens a workspace for the sample, types the inputs, calculates and
/// returns the presentation plus the snapshot pending save.
pub async fn run_calculation(
    service: &dyn MeasurementService,
    config: &AppConfig,
    request: RunRequest,
) -> Result<RunReport> {
    let context = config.sampling_context(request.sample_id);
    let mut workspace = Workspace::open(service, context, config.timeout())
        .await
        .with_context(|| format!("cannot load methods for sample {}", request.sample_id))?;

    for id in &request.locked {
        workspace.set_locked(*id, true);
    }
    if let Some(id) = request.method_id {
        workspace
            .select_method(id)
            .with_context(|| format!("method {id} is not available for this sample"))?;
    }
    let method = workspace.current_method();
    info!(method_id = method.id, method = %method.name, "method selected");

    let applied = csv_loader::apply_rows(&mut workspace, &request.inputs)?;
    debug!(applied, "inputs applied");

    if let Some(date) = request.activity_date {
        workspace.set_activity_date(date)?;
    }

    workspace.calculate(service).await.context("calculation failed")?;

    let view = workspace
        .result_view()
        .context("calculation produced no result")?;
    let snapshot = workspace.open_save()?.clone();
    Ok(RunReport { view, snapshot })
}
