//! Host-agnostic input events.
//!
//! Pointer coordinates are in screen space (pixels relative to the canvas
//! element). The controller converts them to world space through the
//! viewport.

use loom_core::model::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` index.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Right,
            _ => PointerButton::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    /// Delivered for any release, wherever the pointer is.
    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    Wheel {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        modifiers: Modifiers,
    },
    Key {
        key: String,
        modifiers: Modifiers,
        /// Focus is inside a text input or textarea.
        in_text_input: bool,
    },
}

impl InputEvent {
    /// Screen position of pointer-like events.
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerDown { x, y, .. }
            | InputEvent::PointerMove { x, y, .. }
            | InputEvent::PointerUp { x, y, .. }
            | InputEvent::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            InputEvent::Key { .. } => None,
        }
    }
}
