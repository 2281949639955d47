//! Decimal helpers shared by the session and the presentation layer.
//!
//! The service speaks period decimals ("wire form"); the operator sees comma
//! decimals ("display form").

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Display-form decimal separator.
pub const DISPLAY_SEPARATOR: char = ',';

/// Wire-form decimal separator.
pub const WIRE_SEPARATOR: char = '.';

/// Trims `value` and converts its separator to wire form.
///
/// # Examples
///
/// ```
/// use lab_core::calculations::common::to_wire_decimal;
///
/// assert_eq!(to_wire_decimal(" 12,5 "), "12.5");
/// assert_eq!(to_wire_decimal(""), "");
/// ```
pub fn to_wire_decimal(value: &str) -> String {
    value.trim().replace(DISPLAY_SEPARATOR, ".")
}

/// Converts a wire-form decimal to display form.
///
/// # Examples
///
/// ```
/// use lab_core::calculations::common::to_display_decimal;
///
/// assert_eq!(to_display_decimal("7.25"), "7,25");
/// ```
pub fn to_display_decimal(value: &str) -> String {
    value.replace(WIRE_SEPARATOR, ",")
}

/// Parses either form into a [`Decimal`], accepting scientific notation.
///
/// Returns `None` for empty or unparseable text.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let normalized = to_wire_decimal(value);
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Number of digits after the decimal separator of `reference` (0 if none).
pub fn fraction_digits(reference: &str) -> u32 {
    let reference = reference.trim();
    reference
        .rfind([DISPLAY_SEPARATOR, WIRE_SEPARATOR])
        .map(|pos| {
            reference[pos + 1..]
                .chars()
                .take_while(char::is_ascii_digit)
                .count() as u32
        })
        .unwrap_or(0)
}

/// Rounds `value` to one more decimal place than `reference` carries and
/// renders it in display form.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use lab_core::calculations::common::round_to_reference;
///
/// assert_eq!(round_to_reference(dec!(7.2546), "12,3"), "7,25");
/// assert_eq!(round_to_reference(dec!(7.2546), "12"), "7,3");
/// ```
pub fn round_to_reference(
    value: Decimal,
    reference: &str,
) -> String {
    let places = fraction_digits(reference) + 1;
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    to_display_decimal(&format!("{:.*}", places as usize, rounded))
}

/// Text variant of [`round_to_reference`]; text that is not a number is
/// returned in display form without rounding.
pub fn round_text_to_reference(
    value: &str,
    reference: &str,
) -> String {
    match parse_decimal(value) {
        Some(number) => round_to_reference(number, reference),
        None => to_display_decimal(value),
    }
}
