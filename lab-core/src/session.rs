//! Request/response cycle of the "Calculate" action and the per-method
//! result caches.
//!
//! A calculation runs in three steps so an event loop can keep working while
//! the remote call is outstanding:
//!
//! 1. [`CalculationSession::begin`] marks the method busy and hands out a
//!    [`CalculationTicket`]; a second `begin` for the same method fails until
//!    the ticket is completed.
//! 2. [`CalculationSession::evaluate`] talks to the service. It borrows
//!    nothing from the session.
//! 3. [`CalculationSession::complete`] releases the busy flag and, on
//!    success only, replaces the method's result slot and snapshot.
//!
//! [`CalculationSession::forget`] and [`CalculationSession::retain`] cancel
//! any calculation in flight for the methods they drop: the busy flag is
//! cleared at once and the outcome of the old ticket is discarded when it
//! is completed.
//!
//! [`CalculationSession::calculate`] chains the three for callers that do
//! not need to interleave.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::calculations::common::{to_display_decimal, to_wire_decimal};
use crate::models::{
    CalculationRequest, CalculationResult, LastCalculationSnapshot, MethodId, MethodRecord,
};
use crate::service::{MeasurementService, ServiceError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("a calculation for method {0} is already in progress")]
    InProgress(MethodId),

    /// The authoritative schema could not be fetched; nothing was submitted.
    #[error("schema for method {method_id} is unavailable: {source}")]
    SchemaUnavailable {
        method_id: MethodId,
        #[source]
        source: ServiceError,
    },

    /// The evaluation was rejected, crashed, or timed out. `message` is
    /// ready to show to the operator.
    #[error("calculation for method {method_id} failed: {message}")]
    EvaluationFailed { method_id: MethodId, message: String },

    /// The method was cleared or left the catalog while the calculation
    /// was in flight; its outcome was discarded.
    #[error("calculation for method {0} was cancelled")]
    Cancelled(MethodId),
}

/// Proof that a calculation for one method is in flight.
///
/// Deliberately neither `Clone` nor `Copy`: completing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct CalculationTicket {
    method_id: MethodId,
    generation: u64,
}

impl CalculationTicket {
    pub fn method_id(&self) -> MethodId {
        self.method_id
    }
}

/// Successful outcome of [`CalculationSession::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Wire-form inputs exactly as submitted.
    pub input_data: BTreeMap<String, String>,
    pub unit: Option<String>,
    /// Result as the service returned it (wire decimals).
    pub raw: CalculationResult,
}

/// Collects one wire-form value per declared input field.
///
/// Values are trimmed and use the wire separator; a field missing from the
/// form is sent as an empty string rather than omitted.
pub fn collect_inputs(
    schema: &MethodRecord,
    values: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    schema
        .input_fields
        .iter()
        .flatten()
        .map(|field| {
            let value = values
                .get(&field.name)
                .map(|v| to_wire_decimal(v))
                .unwrap_or_default();
            (field.name.clone(), value)
        })
        .collect()
}

/// Rewrites every wire decimal of a result into display form.
pub fn to_display_result(raw: &CalculationResult) -> CalculationResult {
    CalculationResult {
        result: to_display_decimal(&raw.result),
        measurement_error: to_display_decimal(&raw.measurement_error),
        convergence_kind: raw.convergence_kind,
        intermediate_results: raw
            .intermediate_results
            .iter()
            .map(|(name, value)| (name.clone(), to_display_decimal(value)))
            .collect(),
        conditions: raw.conditions.clone(),
    }
}

/// Per-method result slots, pending-save snapshots and busy flags.
#[derive(Debug)]
pub struct CalculationSession {
    results: HashMap<MethodId, CalculationResult>,
    snapshots: HashMap<MethodId, LastCalculationSnapshot>,
    in_flight: HashSet<MethodId>,
    /// Bumped whenever a method's cached state is dropped; tickets from an
    /// older generation are stale.
    generations: HashMap<MethodId, u64>,
    timeout: Duration,
}

impl Default for CalculationSession {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CalculationSession {
    pub fn new(timeout: Duration) -> Self {
        Self {
            results: HashMap::new(),
            snapshots: HashMap::new(),
            in_flight: HashSet::new(),
            generations: HashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Live result for `method_id`, in display form.
    pub fn result(
        &self,
        method_id: MethodId,
    ) -> Option<&CalculationResult> {
        self.results.get(&method_id)
    }

    pub fn snapshot(
        &self,
        method_id: MethodId,
    ) -> Option<&LastCalculationSnapshot> {
        self.snapshots.get(&method_id)
    }

    pub fn is_busy(
        &self,
        method_id: MethodId,
    ) -> bool {
        self.in_flight.contains(&method_id)
    }

    /// Marks `method_id` busy.
    pub fn begin(
        &mut self,
        method_id: MethodId,
    ) -> Result<CalculationTicket, CalculationError> {
        if !self.in_flight.insert(method_id) {
            debug!(method_id, "calculation already in flight");
            return Err(CalculationError::InProgress(method_id));
        }
        Ok(CalculationTicket {
            method_id,
            generation: self.generation(method_id),
        })
    }

    /// True once `ticket` was invalidated by [`forget`](Self::forget) or
    /// [`retain`](Self::retain).
    pub fn is_cancelled(
        &self,
        ticket: &CalculationTicket,
    ) -> bool {
        ticket.generation != self.generation(ticket.method_id)
    }

    fn generation(
        &self,
        method_id: MethodId,
    ) -> u64 {
        self.generations.get(&method_id).copied().unwrap_or_default()
    }

    /// Invalidates outstanding tickets for `method_id` and clears its flag.
    fn cancel(
        &mut self,
        method_id: MethodId,
    ) {
        if self.in_flight.remove(&method_id) {
            info!(method_id, "in-flight calculation cancelled");
        }
        *self.generations.entry(method_id).or_default() += 1;
    }

    /// Fetches the authoritative schema, submits the inputs and returns the
    /// raw outcome, all bounded by `timeout`.
    pub async fn evaluate(
        service: &dyn MeasurementService,
        ticket: &CalculationTicket,
        values: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Evaluation, CalculationError> {
        let method_id = ticket.method_id;
        match tokio::time::timeout(timeout, run_evaluation(service, method_id, values)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CalculationError::EvaluationFailed {
                method_id,
                message: ServiceError::Timeout(timeout).user_message(),
            }),
        }
    }

    /// Releases the busy flag and records a successful outcome.
    ///
    /// A failure leaves the previous result and snapshot untouched. A ticket
    /// cancelled by [`forget`](Self::forget) or [`retain`](Self::retain)
    /// records nothing and yields [`CalculationError::Cancelled`]; the flag
    /// it held is already gone, so a newer calculation keeps its own.
    pub fn complete(
        &mut self,
        ticket: CalculationTicket,
        outcome: Result<Evaluation, CalculationError>,
    ) -> Result<&CalculationResult, CalculationError> {
        let method_id = ticket.method_id;
        if self.is_cancelled(&ticket) {
            debug!(method_id, "discarding outcome of cancelled calculation");
            return Err(CalculationError::Cancelled(method_id));
        }
        self.in_flight.remove(&method_id);

        match outcome {
            Ok(evaluation) => {
                info!(
                    method_id,
                    convergence = evaluation.raw.convergence_kind.as_str(),
                    "calculation succeeded"
                );
                let snapshot = LastCalculationSnapshot::from_result(
                    evaluation.input_data,
                    evaluation.unit,
                    &evaluation.raw,
                );
                self.snapshots.insert(method_id, snapshot);
                self.results
                    .insert(method_id, to_display_result(&evaluation.raw));
                Ok(&self.results[&method_id])
            }
            Err(err) => {
                error!(method_id, error = %err, "calculation failed");
                Err(err)
            }
        }
    }

    /// Runs a whole calculation for `method_id`.
    pub async fn calculate(
        &mut self,
        service: &dyn MeasurementService,
        method_id: MethodId,
        values: &HashMap<String, String>,
    ) -> Result<&CalculationResult, CalculationError> {
        let ticket = self.begin(method_id)?;
        let outcome = Self::evaluate(service, &ticket, values, self.timeout).await;
        self.complete(ticket, outcome)
    }

    /// Drops the result slot and snapshot of `method_id` and cancels a
    /// calculation in flight for it.
    pub fn forget(
        &mut self,
        method_id: MethodId,
    ) {
        self.results.remove(&method_id);
        self.snapshots.remove(&method_id);
        self.cancel(method_id);
    }

    /// Drops every cached result whose method is not in `keep` and cancels
    /// their calculations in flight.
    pub fn retain(
        &mut self,
        keep: &HashSet<MethodId>,
    ) {
        let dropped: HashSet<MethodId> = self
            .results
            .keys()
            .chain(self.snapshots.keys())
            .chain(self.in_flight.iter())
            .filter(|id| !keep.contains(*id))
            .copied()
            .collect();
        for method_id in dropped {
            self.forget(method_id);
        }
    }
}

async fn run_evaluation(
    service: &dyn MeasurementService,
    method_id: MethodId,
    values: &HashMap<String, String>,
) -> Result<Evaluation, CalculationError> {
    let schema = service
        .method(method_id)
        .await
        .map_err(|source| CalculationError::SchemaUnavailable { method_id, source })?
        .normalized();

    let input_data = collect_inputs(&schema, values);
    let unit = schema.unit.clone();
    let request = CalculationRequest {
        input_data,
        research_method: schema,
    };

    info!(method_id, fields = request.input_data.len(), "submitting calculation");
    let raw = service
        .calculate(&request)
        .await
        .map_err(|err| {
            error!(method_id, error = %err, "evaluation service rejected calculation");
            CalculationError::EvaluationFailed {
                method_id,
                message: err.user_message(),
            }
        })?;

    Ok(Evaluation {
        input_data: request.input_data,
        unit,
        raw,
    })
}
