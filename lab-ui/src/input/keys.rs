//! Which key presses a measurement field lets through.
//!
//! Digits, separators, minus and the editing keys pass. Enter moves focus
//! within the card, Tab is swallowed, and clipboard shortcuts always work.

/// A key press as the field editor receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Tab,
    Enter,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        meta: false,
        alt: false,
        shift: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What the field editor should do with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Let the editor handle the key.
    Pass,
    /// Swallow the key.
    Suppress,
    /// Swallow the key and move focus to the next field of the card.
    FocusNextInCard,
}

/// Clipboard and select-all shortcuts, on both Latin and Russian layouts.
fn is_clipboard_shortcut(ch: char) -> bool {
    matches!(
        ch.to_lowercase().next().unwrap_or(ch),
        'c' | 'x' | 'v' | 'a' | 'с' | 'ч' | 'м' | 'ф'
    )
}

/// Key policy for numeric measurement fields.
pub fn key_action(
    key: Key,
    modifiers: Modifiers,
) -> KeyAction {
    match key {
        Key::Char(ch) if modifiers.command() && is_clipboard_shortcut(ch) => KeyAction::Pass,
        Key::Char(_) if modifiers.command() || modifiers.alt => KeyAction::Suppress,
        Key::Char(ch) if ch.is_ascii_digit() || matches!(ch, ',' | '.' | '-') => KeyAction::Pass,
        Key::Backspace
        | Key::Delete
        | Key::Escape
        | Key::ArrowLeft
        | Key::ArrowRight
        | Key::ArrowUp
        | Key::ArrowDown => KeyAction::Pass,
        Key::Enter => KeyAction::FocusNextInCard,
        Key::Tab | Key::Char(_) | Key::Other => KeyAction::Suppress,
    }
}
