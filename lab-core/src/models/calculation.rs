use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::method::MethodRecord;

/// Verdict on whether a repeated measurement's spread satisfies its
/// acceptance condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceKind {
    Custom,
    Satisfactory,
    Unsatisfactory,
    Absence,
    Traces,
}

impl ConvergenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Satisfactory => "satisfactory",
            Self::Unsatisfactory => "unsatisfactory",
            Self::Absence => "absence",
            Self::Traces => "traces",
        }
    }

    /// Display label for outcomes that replace the numeric result.
    ///
    /// `satisfactory` and `custom` keep their numeric payload and have none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Unsatisfactory => Some("неудовлетворительно"),
            Self::Traces => Some("следы"),
            Self::Absence => Some("отсутствие"),
            Self::Satisfactory | Self::Custom => None,
        }
    }
}

/// One acceptance condition evaluated by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub formula: String,
    #[serde(default, deserialize_with = "wire_text")]
    pub calculation_steps: String,
    #[serde(default, deserialize_with = "wire_text")]
    pub convergence_value: String,
    #[serde(default)]
    pub satisfied: bool,
}

/// Structured outcome of one remote evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    #[serde(deserialize_with = "wire_text")]
    pub result: String,
    #[serde(default, deserialize_with = "wire_text")]
    pub measurement_error: String,
    #[serde(rename = "convergence")]
    pub convergence_kind: ConvergenceKind,
    #[serde(default, deserialize_with = "wire_text_map")]
    pub intermediate_results: BTreeMap<String, String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Body of `POST calculate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    /// Field name to wire-form decimal text; every declared field is present.
    pub input_data: BTreeMap<String, String>,
    pub research_method: MethodRecord,
}

/// Renders a JSON scalar as the text the service meant; `null` becomes "".
fn value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// The service sends decimals either as strings or as bare JSON numbers.
fn wire_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_text)
}

fn wire_text_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name, value_text(value)))
        .collect())
}
