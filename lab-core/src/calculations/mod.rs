//! Pure text and number transforms used to present calculation results.
//!
//! Nothing in here performs I/O or keeps state.

pub mod common;
pub mod formula;

pub use common::{round_text_to_reference, round_to_reference, to_display_decimal, to_wire_decimal};
pub use formula::{render_formula, replace_abs};
