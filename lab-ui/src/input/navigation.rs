//! Enter-key navigation between fields of the same card.

use lab_core::{Field, Method};

/// Field that Enter moves to from `current`.
///
/// Fields sharing a card index form a ring in declaration order; the last
/// one wraps to the first. A lone field is its own successor.
pub fn next_in_card<'a>(
    method: &'a Method,
    current: &str,
) -> Option<&'a Field> {
    let card_index = method.field(current)?.card_index;
    let ring: Vec<&Field> = method.card_ring(card_index).collect();
    let position = ring.iter().position(|f| f.name == current)?;
    ring.get((position + 1) % ring.len()).copied()
}
