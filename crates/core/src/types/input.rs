use super::CursorPosition;
use serde::{Deserialize, Serialize};

/// Mouse button, numbered as X11 buttons on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// X11 button number.
    pub fn x11_button(&self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
}

/// A single input command applied by the remote input backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    /// Move the pointer; acknowledged once the move has been applied.
    MoveMouse { to: CursorPosition },
    /// Click at the current pointer position `repeat` times.
    Click { button: MouseButton, repeat: u32 },
    ButtonDown { button: MouseButton },
    ButtonUp { button: MouseButton },
    Scroll {
        direction: ScrollDirection,
        amount: u32,
    },
    /// Type text with `delay_ms` between keystrokes.
    TypeText { text: String, delay_ms: u64 },
    /// Press a key combination given as X keysym names, e.g. `Control_L+c`.
    KeyCombo { keys: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x11_button_numbers() {
        assert_eq!(MouseButton::Left.x11_button(), 1);
        assert_eq!(MouseButton::Middle.x11_button(), 2);
        assert_eq!(MouseButton::Right.x11_button(), 3);
    }

    #[test]
    fn input_action_is_tagged_by_variant() {
        let action = InputAction::Click {
            button: MouseButton::Right,
            repeat: 1,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["click"]["button"], "right");
        assert_eq!(json["click"]["repeat"], 1);
    }
}
