//! Numeric input normalizer for raw measurement fields.
//!
//! Values are kept in Russian-locale decimal form (`-12,5`) while the
//! operator types, pastes or moves between fields.

pub mod grammar;
pub mod keys;
pub mod navigation;

pub use grammar::{Edit, EditRejection, apply_edit, apply_paste, is_accepted};
pub use keys::{Key, KeyAction, Modifiers, key_action};
pub use navigation::next_in_card;
