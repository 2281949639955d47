use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::calculation::{CalculationResult, ConvergenceKind};

/// Payload of the last successful calculation for a method, pending save.
///
/// This is the only object handed to the save flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCalculationSnapshot {
    /// Exactly the wire-form inputs that were submitted.
    pub input_data: BTreeMap<String, String>,
    /// Raw numeric payload as returned by the service.
    pub result: String,
    pub measurement_error: String,
    pub unit: Option<String>,
    pub convergence: ConvergenceKind,
    /// Set for `unsatisfactory`, `traces` and `absence`.
    pub convergence_label: Option<String>,
}

impl LastCalculationSnapshot {
    pub fn from_result(
        input_data: BTreeMap<String, String>,
        unit: Option<String>,
        raw: &CalculationResult,
    ) -> Self {
        Self {
            input_data,
            result: raw.result.clone(),
            measurement_error: raw.measurement_error.clone(),
            unit,
            convergence: raw.convergence_kind,
            convergence_label: raw.convergence_kind.label().map(str::to_string),
        }
    }
}
