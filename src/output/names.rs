//! # Virtual Names
//!
//! Resolves the virtual names stored in mapping profiles to output targets.
//!
//! | Name(s) | Target |
//! |---------|--------|
//! | `BTN_A` / `BTN_SOUTH` | Gamepad A |
//! | `BTN_B` / `BTN_EAST` | Gamepad B |
//! | `BTN_X` / `BTN_NORTH` | Gamepad X |
//! | `BTN_Y` / `BTN_WEST` | Gamepad Y |
//! | `BTN_TL`, `BTN_TR`, `BTN_TL2`, `BTN_TR2` | Shoulders |
//! | `BTN_SELECT`, `BTN_START`, `BTN_MODE` | System buttons |
//! | `BTN_THUMBL`, `BTN_THUMBR` | Stick clicks |
//! | `BTN_DPAD_UP` .. `BTN_DPAD_RIGHT` (or `DPAD_UP` ..) | Synthetic hat |
//! | `MOUSE_LEFT`, `MOUSE_RIGHT`, `MOUSE_MIDDLE` | Mouse clicks (mouse mode) |
//! | `MOUSE_DOUBLE_CLICK`, `SCROLL_UP`, `SCROLL_DOWN` | Mouse actions (mouse mode) |
//! | `ABS_X`, `ABS_Y`, `ABS_RX`, `ABS_RY` | Stick axes (axis bindings) |
//! | `ABS_HAT0X`, `ABS_HAT0Y` | Hat axes (axis bindings) |

use evdev::{AbsoluteAxisType, Key};

/// One of the four synthetic D-pad keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpadDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Virtual mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Key code the virtual mouse reports for this button.
    #[must_use]
    pub fn key(self) -> Key {
        match self {
            MouseButton::Left => Key::BTN_LEFT,
            MouseButton::Right => Key::BTN_RIGHT,
            MouseButton::Middle => Key::BTN_MIDDLE,
        }
    }
}

/// Actions a button can trigger while mouse mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Click(MouseButton),
    DoubleClick,
    ScrollUp,
    ScrollDown,
}

/// What a virtual name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualTarget {
    /// A button on the virtual gamepad (key code)
    Button(u16),
    /// A synthetic D-pad key driving the hat axes
    Dpad(DpadDirection),
    /// A mouse action
    Mouse(MouseAction),
    /// An absolute axis on the virtual gamepad (axis code)
    Axis(u16),
}

impl VirtualTarget {
    /// True for the two hat axes, which only take -1, 0 or +1.
    #[must_use]
    pub fn is_hat_axis(self) -> bool {
        matches!(
            self,
            VirtualTarget::Axis(code)
                if code == AbsoluteAxisType::ABS_HAT0X.0 || code == AbsoluteAxisType::ABS_HAT0Y.0
        )
    }
}

/// Buttons declared by the virtual gamepad.
#[must_use]
pub fn gamepad_buttons() -> [Key; 13] {
    [
        Key::BTN_SOUTH,
        Key::BTN_EAST,
        Key::BTN_NORTH,
        Key::BTN_WEST,
        Key::BTN_TL,
        Key::BTN_TR,
        Key::BTN_TL2,
        Key::BTN_TR2,
        Key::BTN_SELECT,
        Key::BTN_START,
        Key::BTN_MODE,
        Key::BTN_THUMBL,
        Key::BTN_THUMBR,
    ]
}

fn gamepad_button(name: &str) -> Option<Key> {
    let key = match name {
        "BTN_A" | "BTN_SOUTH" => Key::BTN_SOUTH,
        "BTN_B" | "BTN_EAST" => Key::BTN_EAST,
        "BTN_X" | "BTN_NORTH" => Key::BTN_NORTH,
        "BTN_Y" | "BTN_WEST" => Key::BTN_WEST,
        "BTN_TL" => Key::BTN_TL,
        "BTN_TR" => Key::BTN_TR,
        "BTN_TL2" => Key::BTN_TL2,
        "BTN_TR2" => Key::BTN_TR2,
        "BTN_SELECT" => Key::BTN_SELECT,
        "BTN_START" => Key::BTN_START,
        "BTN_MODE" => Key::BTN_MODE,
        "BTN_THUMBL" => Key::BTN_THUMBL,
        "BTN_THUMBR" => Key::BTN_THUMBR,
        _ => return None,
    };
    Some(key)
}

/// Resolves a virtual name; `None` for names with no output counterpart.
///
/// # Examples
///
/// ```
/// use joypad_remap::output::names::{resolve, DpadDirection, VirtualTarget};
///
/// assert_eq!(resolve("BTN_A"), Some(VirtualTarget::Button(304)));
/// assert_eq!(resolve("BTN_DPAD_UP"), Some(VirtualTarget::Dpad(DpadDirection::Up)));
/// assert_eq!(resolve("KEY_SPACE"), None);
/// ```
#[must_use]
pub fn resolve(name: &str) -> Option<VirtualTarget> {
    let name = name.trim();
    if let Some(key) = gamepad_button(name) {
        return Some(VirtualTarget::Button(key.code()));
    }

    let target = match name {
        "BTN_DPAD_UP" | "DPAD_UP" => VirtualTarget::Dpad(DpadDirection::Up),
        "BTN_DPAD_DOWN" | "DPAD_DOWN" => VirtualTarget::Dpad(DpadDirection::Down),
        "BTN_DPAD_LEFT" | "DPAD_LEFT" => VirtualTarget::Dpad(DpadDirection::Left),
        "BTN_DPAD_RIGHT" | "DPAD_RIGHT" => VirtualTarget::Dpad(DpadDirection::Right),
        "MOUSE_LEFT" => VirtualTarget::Mouse(MouseAction::Click(MouseButton::Left)),
        "MOUSE_RIGHT" => VirtualTarget::Mouse(MouseAction::Click(MouseButton::Right)),
        "MOUSE_MIDDLE" => VirtualTarget::Mouse(MouseAction::Click(MouseButton::Middle)),
        "MOUSE_DOUBLE_CLICK" => VirtualTarget::Mouse(MouseAction::DoubleClick),
        "SCROLL_UP" => VirtualTarget::Mouse(MouseAction::ScrollUp),
        "SCROLL_DOWN" => VirtualTarget::Mouse(MouseAction::ScrollDown),
        "ABS_X" => VirtualTarget::Axis(AbsoluteAxisType::ABS_X.0),
        "ABS_Y" => VirtualTarget::Axis(AbsoluteAxisType::ABS_Y.0),
        "ABS_RX" => VirtualTarget::Axis(AbsoluteAxisType::ABS_RX.0),
        "ABS_RY" => VirtualTarget::Axis(AbsoluteAxisType::ABS_RY.0),
        "ABS_HAT0X" => VirtualTarget::Axis(AbsoluteAxisType::ABS_HAT0X.0),
        "ABS_HAT0Y" => VirtualTarget::Axis(AbsoluteAxisType::ABS_HAT0Y.0),
        _ => return None,
    };
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_button_aliases() {
        assert_eq!(resolve("BTN_A"), resolve("BTN_SOUTH"));
        assert_eq!(resolve("BTN_B"), resolve("BTN_EAST"));
        assert_eq!(resolve("BTN_X"), Some(VirtualTarget::Button(Key::BTN_NORTH.code())));
        assert_eq!(resolve("BTN_Y"), Some(VirtualTarget::Button(Key::BTN_WEST.code())));
    }

    #[test]
    fn test_every_declared_button_is_reachable() {
        let names = [
            "BTN_A", "BTN_B", "BTN_X", "BTN_Y", "BTN_TL", "BTN_TR", "BTN_TL2", "BTN_TR2",
            "BTN_SELECT", "BTN_START", "BTN_MODE", "BTN_THUMBL", "BTN_THUMBR",
        ];
        for (name, key) in names.iter().zip(gamepad_buttons()) {
            assert_eq!(resolve(name), Some(VirtualTarget::Button(key.code())), "{}", name);
        }
    }

    #[test]
    fn test_dpad_names() {
        assert_eq!(resolve("DPAD_LEFT"), Some(VirtualTarget::Dpad(DpadDirection::Left)));
        assert_eq!(resolve("BTN_DPAD_RIGHT"), Some(VirtualTarget::Dpad(DpadDirection::Right)));
        assert_eq!(resolve("BTN_DPAD_DOWN"), Some(VirtualTarget::Dpad(DpadDirection::Down)));
    }

    #[test]
    fn test_mouse_names() {
        assert_eq!(
            resolve("MOUSE_RIGHT"),
            Some(VirtualTarget::Mouse(MouseAction::Click(MouseButton::Right)))
        );
        assert_eq!(resolve("SCROLL_DOWN"), Some(VirtualTarget::Mouse(MouseAction::ScrollDown)));
        assert_eq!(MouseButton::Left.key(), Key::BTN_LEFT);
    }

    #[test]
    fn test_axis_names() {
        assert_eq!(resolve("ABS_RX"), Some(VirtualTarget::Axis(AbsoluteAxisType::ABS_RX.0)));
        assert!(resolve("ABS_HAT0Y").unwrap().is_hat_axis());
        assert!(!resolve("ABS_Y").unwrap().is_hat_axis());
        assert!(!resolve("BTN_A").unwrap().is_hat_axis());
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("btn_a"), None);
        // Not declared on the virtual gamepad
        assert_eq!(resolve("ABS_Z"), None);
        assert_eq!(resolve("ABS_HAT1X"), None);
    }
}
