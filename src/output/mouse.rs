//! Virtual pointing device used by mouse mode.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key, RelativeAxisType};
use std::io;
use tracing::info;

use super::names::MouseButton;
use crate::error::{RemapError, Result};

pub const MOUSE_NAME: &str = "Joypad Remap Virtual Mouse";

/// uinput-backed relative pointer with three buttons and a wheel.
pub struct VirtualMouse {
    device: VirtualDevice,
}

impl std::fmt::Debug for VirtualMouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMouse").finish_non_exhaustive()
    }
}

impl VirtualMouse {
    pub fn create() -> Result<Self> {
        Self::build()
            .map_err(|e| RemapError::VirtualDevice(format!("Failed to create virtual mouse: {}", e)))
    }

    fn build() -> io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);
        keys.insert(Key::BTN_MIDDLE);

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()?
            .name(MOUSE_NAME)
            .input_id(InputId::new(BusType::BUS_USB, 0x1209, 0x0001, 1))
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;
        info!("Virtual mouse created: {}", MOUSE_NAME);
        Ok(Self { device })
    }

    /// Moves the cursor; both deltas land in one report.
    pub fn move_by(&mut self, dx: i32, dy: i32) -> io::Result<()> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.device.emit(&events)
    }

    pub fn button(&mut self, button: MouseButton, value: i32) -> io::Result<()> {
        self.device
            .emit(&[InputEvent::new(EventType::KEY, button.key().code(), value)])
    }

    /// Positive scrolls up.
    pub fn scroll(&mut self, amount: i32) -> io::Result<()> {
        self.device.emit(&[InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_WHEEL.0,
            amount,
        )])
    }
}
