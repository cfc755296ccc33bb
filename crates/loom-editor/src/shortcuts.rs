//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so every host shares the same bindings.

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Delete,
    Undo,
    Copy,
    Paste,
    SelectAll,
    /// Clear selection and close menus.
    Deselect,
    FitView,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘, on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Everything is suppressed while focus is in a text field, so typing
    /// `f` into a prompt never fits the view.
    pub fn resolve(key: &str, modifiers: Modifiers, in_text_input: bool) -> Option<ShortcutAction> {
        if in_text_input {
            return None;
        }

        if modifiers.command() {
            return match key {
                "z" | "Z" if !modifiers.shift => Some(ShortcutAction::Undo),
                "c" | "C" => Some(ShortcutAction::Copy),
                "v" | "V" => Some(ShortcutAction::Paste),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            "f" | "F" => Some(ShortcutAction::FitView),
            _ => None,
        }
    }
}
