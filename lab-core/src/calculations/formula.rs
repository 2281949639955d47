//! Human-readable rendering of condition formulas and calculation steps.
//!
//! Rendering happens in two passes over the machine text:
//!
//! 1. every `abs( … )` call is replaced by `|…|`, locating the closing
//!    parenthesis by depth counting so nested calls resolve correctly;
//! 2. operators and connectives are swapped for their display glyphs.
//!
//! The first pass must see the untouched `abs(` and `)` tokens, so the order
//! is fixed. A call without a balancing parenthesis stops the first pass and
//! the text is rendered as far as it got.
//!
//! # Example
//!
//! ```
//! use lab_core::calculations::render_formula;
//!
//! assert_eq!(
//!     render_formula("abs(x1-x2)<=0.6*r and x1>=0"),
//!     "|x1-x2|≤0,6×r и x1≥0",
//! );
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

const ABS_MARKER: &str = "abs(";

/// Glyph substitutions, applied in order after bracket substitution.
const GLYPHS: [(&str, &str); 4] = [("<=", "≤"), (">=", "≥"), ("*", "×"), (".", ",")];

static OR_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bor\b").expect("static regex"));
static AND_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\band\b").expect("static regex"));

/// Renders a machine formula or calculation-step expression for display.
///
/// # Arguments
///
/// * `formula` - Expression as the calculation service sends it
///
/// # Returns
///
/// The expression with `abs(..)` as `|..|`, comparison and multiplication
/// glyphs, decimal commas and Russian connectives.
///
/// # Examples
///
/// ```
/// use lab_core::calculations::render_formula;
///
/// assert_eq!(render_formula("abs(x1-x2)<=0.6*r"), "|x1-x2|≤0,6×r");
/// assert_eq!(render_formula("a>=1 or b>=1"), "a≥1 или b≥1");
/// ```
pub fn render_formula(formula: &str) -> String {
    let mut text = replace_abs(formula);
    for (from, to) in GLYPHS {
        text = text.replace(from, to);
    }
    let text = OR_WORD.replace_all(&text, "или");
    AND_WORD.replace_all(&text, "и").into_owned()
}

/// Replaces every balanced `abs(arg)` with `|arg|`, leftmost first.
///
/// Each replacement removes one `abs(` marker and can never create a new
/// one, so the loop terminates on any input.
///
/// # Examples
///
/// ```
/// use lab_core::calculations::replace_abs;
///
/// assert_eq!(replace_abs("abs(a+abs(b))"), "|a+|b||");
/// assert_eq!(replace_abs("abs(a"), "abs(a");
/// ```
pub fn replace_abs(formula: &str) -> String {
    let mut text = formula.to_string();

    while let Some(start) = text.find(ABS_MARKER) {
        let arg_start = start + ABS_MARKER.len();
        let Some(len) = closing_offset(&text[arg_start..]) else {
            debug!(formula, "unbalanced abs( in formula; rendering partially");
            break;
        };
        let arg_end = arg_start + len;
        text = format!(
            "{}|{}|{}",
            &text[..start],
            &text[arg_start..arg_end],
            &text[arg_end + 1..]
        );
    }

    text
}

/// Byte offset of the parenthesis closing an already-open call, scanning
/// from depth 1.
fn closing_offset(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, byte) in rest.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}
