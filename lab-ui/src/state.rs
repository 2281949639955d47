//! Explicit state owned by the workspace controller.
//!
//! Each method keeps its own raw input values, so switching methods never
//! loses what the operator typed. Nothing here is persisted.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use lab_core::MethodId;
use thiserror::Error;

/// Inline message shown on the activity-date field.
pub const MISSING_DATE_MESSAGE: &str = "Укажите дату проведения испытания";

/// A gate that must be open before calculating or saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("activity date is not set")]
    MissingActivityDate,

    #[error("method {0} has no calculated result")]
    MissingResult(MethodId),
}

/// Severity of a message raised for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    inputs: HashMap<MethodId, HashMap<String, String>>,
    focus: Option<String>,
    activity_date: Option<NaiveDate>,
    date_error: Option<String>,
    locked: HashSet<MethodId>,
    notice: Option<Notice>,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw values of one method, keyed by field name.
    pub fn values(
        &self,
        method_id: MethodId,
    ) -> Option<&HashMap<String, String>> {
        self.inputs.get(&method_id)
    }

    pub fn value(
        &self,
        method_id: MethodId,
        field: &str,
    ) -> Option<&str> {
        self.inputs
            .get(&method_id)
            .and_then(|values| values.get(field))
            .map(String::as_str)
    }

    pub fn set_value(
        &mut self,
        method_id: MethodId,
        field: &str,
        value: String,
    ) {
        self.inputs
            .entry(method_id)
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn clear_values(
        &mut self,
        method_id: MethodId,
    ) {
        self.inputs.remove(&method_id);
    }

    /// Drops the inputs of every method not in `keep`.
    pub fn retain_values(
        &mut self,
        keep: &HashSet<MethodId>,
    ) {
        self.inputs.retain(|id, _| keep.contains(id));
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn set_focus(
        &mut self,
        field: Option<String>,
    ) {
        self.focus = field;
    }

    pub fn activity_date(&self) -> Option<NaiveDate> {
        self.activity_date
    }

    /// Setting a date also clears the inline error.
    pub fn set_activity_date(
        &mut self,
        date: NaiveDate,
    ) {
        self.activity_date = Some(date);
        self.date_error = None;
    }

    pub fn clear_activity_date(&mut self) {
        self.activity_date = None;
    }

    pub fn date_error(&self) -> Option<&str> {
        self.date_error.as_deref()
    }

    /// Checks the activity-date gate, raising the inline error when closed.
    pub fn require_activity_date(&mut self) -> Result<NaiveDate, GateError> {
        match self.activity_date {
            Some(date) => Ok(date),
            None => {
                self.date_error = Some(MISSING_DATE_MESSAGE.to_string());
                Err(GateError::MissingActivityDate)
            }
        }
    }

    pub fn is_locked(
        &self,
        method_id: MethodId,
    ) -> bool {
        self.locked.contains(&method_id)
    }

    pub fn set_locked(
        &mut self,
        method_id: MethodId,
        locked: bool,
    ) {
        if locked {
            self.locked.insert(method_id);
        } else {
            self.locked.remove(&method_id);
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notify(
        &mut self,
        level: NoticeLevel,
        text: impl Into<String>,
    ) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
