//! Display model of a calculation result.

use std::fmt;

use lab_core::calculations::{render_formula, round_text_to_reference, to_display_decimal};
use lab_core::{CalculationResult, ConvergenceKind, Method};

/// One intermediate quantity, rounded against the main result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateLine {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLine {
    pub formula: String,
    pub steps: String,
    pub convergence_value: String,
    pub satisfied: bool,
}

/// Everything the result panel shows for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub method_name: String,
    pub result: String,
    pub measurement_error: String,
    pub unit: Option<String>,
    pub convergence: String,
    pub intermediates: Vec<IntermediateLine>,
    pub conditions: Vec<ConditionLine>,
}

fn convergence_text(kind: ConvergenceKind) -> &'static str {
    match kind {
        ConvergenceKind::Satisfactory => "удовлетворительно",
        ConvergenceKind::Custom => "по условиям метода",
        other => other.label().unwrap_or_default(),
    }
}

impl ResultView {
    /// Builds the view from a display-form result.
    ///
    /// Intermediate values follow the method's declared order; names the
    /// method does not declare come last, sorted by name.
    pub fn build(
        method: &Method,
        result: &CalculationResult,
    ) -> Self {
        let reference = &result.result;
        let mut intermediates: Vec<IntermediateLine> = method
            .intermediate_fields
            .iter()
            .filter_map(|field| {
                let value = result.intermediate_results.get(&field.name)?;
                Some(IntermediateLine {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    unit: field.unit.clone(),
                    value: round_text_to_reference(value, reference),
                })
            })
            .collect();

        intermediates.extend(
            result
                .intermediate_results
                .iter()
                .filter(|(name, _)| {
                    !method
                        .intermediate_fields
                        .iter()
                        .any(|field| &field.name == *name)
                })
                .map(|(name, value)| IntermediateLine {
                    name: name.clone(),
                    description: None,
                    unit: None,
                    value: round_text_to_reference(value, reference),
                }),
        );

        let conditions = result
            .conditions
            .iter()
            .map(|condition| ConditionLine {
                formula: render_formula(&condition.formula),
                steps: render_formula(&condition.calculation_steps),
                convergence_value: to_display_decimal(&condition.convergence_value),
                satisfied: condition.satisfied,
            })
            .collect();

        Self {
            method_name: method.name.clone(),
            result: result
                .convergence_kind
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| result.result.clone()),
            measurement_error: result.measurement_error.clone(),
            unit: method.unit.clone(),
            convergence: convergence_text(result.convergence_kind).to_string(),
            intermediates,
            conditions,
        }
    }
}

impl fmt::Display for ResultView {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let unit = self.unit.as_deref().unwrap_or("");
        writeln!(f, "{}", self.method_name)?;
        writeln!(f, "  Результат:   {} {unit}", self.result)?;
        if !self.measurement_error.is_empty() {
            writeln!(f, "  Погрешность: ±{} {unit}", self.measurement_error)?;
        }
        writeln!(f, "  Сходимость:  {}", self.convergence)?;

        for line in &self.intermediates {
            let label = line.description.as_deref().unwrap_or(&line.name);
            let unit = line.unit.as_deref().unwrap_or("");
            writeln!(f, "  {label} = {} {unit}", line.value)?;
        }

        for condition in &self.conditions {
            let mark = if condition.satisfied { "✓" } else { "✗" };
            writeln!(f, "  {mark} {}", condition.formula)?;
            if !condition.steps.is_empty() {
                writeln!(f, "      {}", condition.steps)?;
            }
        }
        Ok(())
    }
}
