use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{debug, info};

use lab_core::MethodId;
use lab_ui::config::AppConfig;
use lab_ui::{app, csv_loader, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Measurement calculation for one laboratory sample.
///
/// Loads the methods the sample is eligible for, fills in raw inputs from a
/// CSV file, runs the remote calculation and prints the result together
/// with the payload that would go to the save step.
#[derive(Debug, Parser)]
#[command(name = "lab-calc")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sample to calculate for.
    #[arg(long)]
    sample: i64,

    /// Method id; defaults to the first available method.
    #[arg(long)]
    method: Option<MethodId>,

    /// CSV file with `field,value` rows.
    #[arg(long)]
    inputs: Option<PathBuf>,

    /// Activity date (YYYY-MM-DD). Calculation is refused without it.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Methods already finalized by the surrounding page.
    #[arg(long = "lock", num_args = 1..)]
    locked: Vec<MethodId>,

    /// Overrides `service.base_url`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `logging.level`.
    #[arg(long)]
    log_level: Option<String>,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_default_logging();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.service.base_url = base_url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    logging::configure(&config.logging)?;

    let inputs = match &cli.inputs {
        Some(path) => csv_loader::load_from_file(path)?,
        None => Vec::new(),
    };

    let service_config = config.service_config();
    debug!(
        backend = %service_config.backend,
        base_url = %service_config.base_url,
        "creating service"
    );
    let registry = app::build_registry();
    let service = registry
        .create(&service_config)
        .await
        .context("cannot create measurement service")?;

    let report = app::run_calculation(
        &*service,
        &config,
        app::RunRequest {
            sample_id: cli.sample,
            method_id: cli.method,
            inputs,
            activity_date: cli.date,
            locked: cli.locked,
        },
    )
    .await?;
    info!("calculation complete");
    println!("{report}");

    Ok(())
}
