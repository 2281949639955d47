//! Per-keystroke validation and the paste policy for measurement fields.
//!
//! Typed text must stay inside `-?\d*,?\d*`; a period is taken as a comma.
//! Pasted text is only stripped of whitespace.
//!
//! ```
//! use lab_ui::input::{apply_edit, apply_paste};
//!
//! assert_eq!(apply_edit("12.5", 4).unwrap().value, "12,5");
//! assert!(apply_edit("1,2,", 4).is_err());
//! assert_eq!(apply_paste("", 0..0, "1 234,56 ").value, "1234,56");
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use lab_core::calculations::common::{DISPLAY_SEPARATOR, WIRE_SEPARATOR};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Every value a measurement field may hold while the operator types.
static FIELD_GRAMMAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]*,?[0-9]*$").expect("field grammar is a valid regex"));

/// Why a keystroke was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditRejection {
    #[error("a value may contain only one decimal comma")]
    SecondSeparator,

    #[error("a value may contain only one minus sign")]
    SecondMinus,

    #[error("a minus sign is only allowed as the first character")]
    MisplacedMinus,

    #[error("character '{0}' is not allowed in a numeric field")]
    InvalidCharacter(char),
}

/// Field text after an accepted edit, with the caret as a char offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub value: String,
    pub cursor: usize,
}

pub fn is_accepted(value: &str) -> bool {
    FIELD_GRAMMAR.is_match(value)
}

/// Validates the text a field would hold after a keystroke.
///
/// `proposed` is the whole field value including the new character and
/// `cursor` the caret position (in chars) the editor reported for it.
/// Periods become commas first; the caret keeps its place relative to the
/// characters around it. A value outside the grammar is rejected as a whole,
/// leaving the field as it was.
pub fn apply_edit(
    proposed: &str,
    cursor: usize,
) -> Result<Edit, EditRejection> {
    let edit = substitute(proposed, cursor, |ch| {
        Some(if ch == WIRE_SEPARATOR { DISPLAY_SEPARATOR } else { ch })
    });

    if !is_accepted(&edit.value) {
        let reason = rejection_reason(&edit.value);
        debug!(value = %edit.value, %reason, "edit rejected");
        return Err(reason);
    }
    Ok(edit)
}

/// Inserts clipboard text over `selection` of `current`.
///
/// Pasted text is trusted: all whitespace is stripped and the remainder goes
/// in verbatim, without the per-keystroke grammar check. The caret ends up
/// after the inserted text.
pub fn apply_paste(
    current: &str,
    selection: Range<usize>,
    clipboard: &str,
) -> Edit {
    let cleaned: String = clipboard.chars().filter(|ch| !ch.is_whitespace()).collect();
    let len = current.chars().count();
    let end = selection.end.min(len);
    let start = selection.start.min(end);

    let mut value: String = current.chars().take(start).collect();
    value.push_str(&cleaned);
    value.extend(current.chars().skip(end));

    Edit {
        value,
        cursor: start + cleaned.chars().count(),
    }
}

/// Maps every char of `text` through `map` (None drops it) and moves the
/// caret by the number of chars inserted or removed to its left.
fn substitute(
    text: &str,
    cursor: usize,
    map: impl Fn(char) -> Option<char>,
) -> Edit {
    let mut value = String::with_capacity(text.len());
    let mut new_cursor = 0;
    for (index, ch) in text.chars().enumerate() {
        if let Some(mapped) = map(ch) {
            value.push(mapped);
            if index < cursor {
                new_cursor += 1;
            }
        }
    }
    if cursor > text.chars().count() {
        new_cursor = value.chars().count();
    }
    Edit {
        value,
        cursor: new_cursor,
    }
}

fn rejection_reason(value: &str) -> EditRejection {
    let mut seen_separator = false;
    let mut seen_minus = false;
    for (index, ch) in value.chars().enumerate() {
        match ch {
            '0'..='9' => {}
            DISPLAY_SEPARATOR if seen_separator => return EditRejection::SecondSeparator,
            DISPLAY_SEPARATOR => seen_separator = true,
            '-' if seen_minus => return EditRejection::SecondMinus,
            '-' if index != 0 => return EditRejection::MisplacedMinus,
            '-' => seen_minus = true,
            other => return EditRejection::InvalidCharacter(other),
        }
    }
    // Every value the grammar refuses is classified by the loop above.
    EditRejection::InvalidCharacter(value.chars().next().unwrap_or(' '))
}
