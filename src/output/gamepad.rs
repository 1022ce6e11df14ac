//! # Virtual Gamepad
//!
//! The uinput gamepad the rest of the system sees.
//!
//! ## Declared Capabilities
//!
//! - Buttons: see [`gamepad_buttons`]
//! - `ABS_X`, `ABS_Y`, `ABS_RX`, `ABS_RY`: -32768..32767
//! - `ABS_HAT0X`, `ABS_HAT0Y`: -1..1
//!
//! Identity is that of an Xbox 360 pad so games pick a sane default layout.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key, UinputAbsSetup};
use std::io;
use tracing::info;

use super::names::gamepad_buttons;
use crate::error::{RemapError, Result};

/// Name shown to applications.
pub const GAMEPAD_NAME: &str = "Joypad Remap Virtual Gamepad";
/// Microsoft vendor ID
pub const GAMEPAD_VENDOR_ID: u16 = 0x045e;
/// Xbox 360 controller product ID
pub const GAMEPAD_PRODUCT_ID: u16 = 0x028e;
pub const GAMEPAD_VERSION: u16 = 1;

/// Stick output range.
pub const STICK_MIN: i32 = -32768;
/// Stick output range.
pub const STICK_MAX: i32 = 32767;
/// Hat output range.
pub const HAT_MIN: i32 = -1;
/// Hat output range.
pub const HAT_MAX: i32 = 1;

/// Axes declared by the virtual gamepad with their ranges.
#[must_use]
pub fn gamepad_axes() -> [(AbsoluteAxisType, i32, i32); 6] {
    [
        (AbsoluteAxisType::ABS_X, STICK_MIN, STICK_MAX),
        (AbsoluteAxisType::ABS_Y, STICK_MIN, STICK_MAX),
        (AbsoluteAxisType::ABS_RX, STICK_MIN, STICK_MAX),
        (AbsoluteAxisType::ABS_RY, STICK_MIN, STICK_MAX),
        (AbsoluteAxisType::ABS_HAT0X, HAT_MIN, HAT_MAX),
        (AbsoluteAxisType::ABS_HAT0Y, HAT_MIN, HAT_MAX),
    ]
}

/// uinput-backed gamepad.
pub struct VirtualGamepad {
    device: VirtualDevice,
}

impl std::fmt::Debug for VirtualGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualGamepad")
            .field("name", &GAMEPAD_NAME)
            .finish_non_exhaustive()
    }
}

impl VirtualGamepad {
    /// Creates the virtual gamepad.
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` if `/dev/uinput` is unavailable or rejects the setup.
    pub fn create() -> Result<Self> {
        Self::build().map_err(|e| {
            RemapError::VirtualDevice(format!("Failed to create virtual gamepad: {}", e))
        })
    }

    fn build() -> io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in gamepad_buttons() {
            keys.insert(key);
        }

        let mut builder = VirtualDeviceBuilder::new()?
            .name(GAMEPAD_NAME)
            .input_id(InputId::new(
                BusType::BUS_USB,
                GAMEPAD_VENDOR_ID,
                GAMEPAD_PRODUCT_ID,
                GAMEPAD_VERSION,
            ))
            .with_keys(&keys)?;

        for (axis, min, max) in gamepad_axes() {
            let setup = UinputAbsSetup::new(axis, AbsInfo::new(0, min, max, 0, 0, 0));
            builder = builder.with_absolute_axis(&setup)?;
        }

        let device = builder.build()?;
        info!("Virtual gamepad created: {}", GAMEPAD_NAME);
        Ok(Self { device })
    }

    /// Writes one key event followed by `SYN_REPORT`.
    pub fn emit_button(&mut self, code: u16, value: i32) -> io::Result<()> {
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, value)])
    }

    /// Writes one absolute axis event followed by `SYN_REPORT`.
    pub fn emit_axis(&mut self, code: u16, value: i32) -> io::Result<()> {
        self.device
            .emit(&[InputEvent::new(EventType::ABSOLUTE, code, value)])
    }
}
