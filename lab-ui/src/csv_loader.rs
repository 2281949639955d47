//! CSV loader for raw measurement inputs.
//!
//! ## CSV Format
//!
//! Two columns, matched by header name:
//!
//! | Column  | Notes                                              |
//! |---------|----------------------------------------------------|
//! | `field` | Input field name as declared by the method         |
//! | `value` | Raw value; `.` or `,` as decimal separator, may be empty |
//!
//! ```csv
//! field,value
//! m1,12.5
//! m2,"12,1"
//! ```
//!
//! Values go through the same grammar as typed input, so `1e5` or `1,2,3`
//! are rejected with the row that carried them.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::input::{self, EditRejection};
use crate::workspace::{Workspace, WorkspaceError};

// ---------------------------------------------------------------------------
// Serde-compatible row that mirrors the CSV layout exactly
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    field: String,
    #[serde(default)]
    value: String,
}

/// One accepted input, already in display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub field: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CsvLoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("row {row}: empty field name")]
    MissingField { row: usize },

    #[error("row {row}: invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        row: usize,
        field: String,
        value: String,
        reason: EditRejection,
    },

    #[error("row {row}: cannot apply '{field}': {source}")]
    Rejected {
        row: usize,
        field: String,
        #[source]
        source: WorkspaceError,
    },
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<InputRow, CsvLoadError> {
    if row.field.is_empty() {
        return Err(CsvLoadError::MissingField { row: row_number });
    }
    let edit = input::apply_edit(&row.value, row.value.chars().count()).map_err(|reason| {
        CsvLoadError::InvalidValue {
            row: row_number,
            field: row.field.clone(),
            value: row.value.clone(),
            reason,
        }
    })?;
    Ok(InputRow {
        row: row_number,
        field: row.field,
        value: edit.value,
    })
}

/// Parses CSV text into input rows, in file order.
///
/// # Errors
///
/// * [CsvLoadError::Parse] if the CSV is structurally invalid.
/// * [CsvLoadError::MissingField] or [CsvLoadError::InvalidValue] for the
///   first bad row.
pub fn load_from_str(input: &str) -> Result<Vec<InputRow>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| convert_row(result?, idx + 1))
        .collect()
}

/// Reads a file from disk and delegates to [load_from_str].
pub fn load_from_file(path: &Path) -> Result<Vec<InputRow>, CsvLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}

/// Types every row into the current method of `workspace`.
///
/// Stops at the first row the workspace refuses; earlier rows stay applied.
pub fn apply_rows(
    workspace: &mut Workspace,
    rows: &[InputRow],
) -> Result<usize, CsvLoadError> {
    for row in rows {
        workspace
            .edit_field(&row.field, &row.value, row.value.chars().count())
            .map_err(|source| CsvLoadError::Rejected {
                row: row.row,
                field: row.field.clone(),
                source,
            })?;
    }
    debug!(rows = rows.len(), "inputs applied from CSV");
    Ok(rows.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(
        row: usize,
        field: &str,
        value: &str,
    ) -> InputRow {
        InputRow {
            row,
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn values_are_normalized_to_display_form() {
        let rows = load_from_str("field,value\nm1,12.5\nm2,\"-0,25\"\n").unwrap();

        assert_eq!(rows, vec![row(1, "m1", "12,5"), row(2, "m2", "-0,25")]);
    }

    #[test]
    fn whitespace_around_cells_is_ignored() {
        let rows = load_from_str("field , value\n m1 , 7 \n").unwrap();

        assert_eq!(rows, vec![row(1, "m1", "7")]);
    }

    #[test]
    fn empty_value_is_allowed() {
        let rows = load_from_str("field,value\nm1,\n").unwrap();

        assert_eq!(rows, vec![row(1, "m1", "")]);
    }

    #[test]
    fn header_order_does_not_matter() {
        let rows = load_from_str("value,field\n3,m1\n").unwrap();

        assert_eq!(rows, vec![row(1, "m1", "3")]);
    }

    #[test]
    fn invalid_value_reports_row() {
        let err = load_from_str("field,value\nm1,1\nm2,1e5\n").unwrap_err();

        match err {
            CsvLoadError::InvalidValue {
                row, field, reason, ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(field, "m2");
                assert_eq!(reason, EditRejection::InvalidCharacter('e'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_field_name_is_rejected() {
        let err = load_from_str("field,value\n,1\n").unwrap_err();

        assert!(matches!(err, CsvLoadError::MissingField { row: 1 }));
    }

    #[test]
    fn missing_column_is_parse_error() {
        let err = load_from_str("name,value\nm1,1\n").unwrap_err();

        assert!(matches!(err, CsvLoadError::Parse(_)));
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let err = load_from_str("field,value\nm1,1,2\n").unwrap_err();

        assert!(matches!(err, CsvLoadError::Parse(_)));
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert_eq!(load_from_str("field,value\n").unwrap(), Vec::new());
    }
}
