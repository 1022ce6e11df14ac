//! # Output Module
//!
//! Synthetic devices the engine writes to.
//!
//! This module handles:
//! - Creating the uinput virtual gamepad with a fixed capability set
//! - Lazily creating a virtual mouse the first time mouse mode emits
//! - Resolving profile virtual names to output targets
//!
//! Every emit writes its event(s) followed by a `SYN_REPORT`, so consumers
//! never observe a half-applied update.

pub mod gamepad;
pub mod mouse;
pub mod names;

use tracing::debug;

use crate::error::{RemapError, Result};

pub use gamepad::VirtualGamepad;
pub use mouse::VirtualMouse;
pub use names::{DpadDirection, MouseAction, MouseButton, VirtualTarget};

/// Destination for the engine's output actions.
pub trait OutputSink {
    /// Key press (1) or release (0) on the virtual gamepad.
    fn emit_button(&mut self, code: u16, value: i32) -> Result<()>;

    /// Absolute axis value on the virtual gamepad.
    fn emit_axis(&mut self, code: u16, value: i32) -> Result<()>;

    /// Relative pointer motion.
    fn move_pointer(&mut self, dx: i32, dy: i32) -> Result<()>;

    /// Pointer button press (1) or release (0).
    fn click(&mut self, button: MouseButton, value: i32) -> Result<()>;

    /// Wheel motion, positive is up.
    fn scroll(&mut self, amount: i32) -> Result<()>;

    /// Destroys the pointer device if one was created.
    fn close_pointer(&mut self) -> Result<()>;

    /// Destroys the gamepad.
    fn close(&mut self) -> Result<()>;
}

/// The real output: virtual gamepad plus an on-demand virtual mouse.
#[derive(Debug)]
pub struct VirtualOutput {
    gamepad: Option<VirtualGamepad>,
    mouse: Option<VirtualMouse>,
}

impl VirtualOutput {
    /// Creates the virtual gamepad. The mouse is created on first use.
    pub fn create() -> Result<Self> {
        Ok(Self {
            gamepad: Some(VirtualGamepad::create()?),
            mouse: None,
        })
    }

    fn gamepad(&mut self) -> Result<&mut VirtualGamepad> {
        self.gamepad
            .as_mut()
            .ok_or_else(|| RemapError::VirtualDevice("virtual gamepad already closed".to_string()))
    }

    fn mouse(&mut self) -> Result<&mut VirtualMouse> {
        if self.mouse.is_none() {
            self.mouse = Some(VirtualMouse::create()?);
        }
        self.mouse
            .as_mut()
            .ok_or_else(|| RemapError::VirtualDevice("virtual mouse unavailable".to_string()))
    }
}

impl OutputSink for VirtualOutput {
    fn emit_button(&mut self, code: u16, value: i32) -> Result<()> {
        Ok(self.gamepad()?.emit_button(code, value)?)
    }

    fn emit_axis(&mut self, code: u16, value: i32) -> Result<()> {
        Ok(self.gamepad()?.emit_axis(code, value)?)
    }

    fn move_pointer(&mut self, dx: i32, dy: i32) -> Result<()> {
        Ok(self.mouse()?.move_by(dx, dy)?)
    }

    fn click(&mut self, button: MouseButton, value: i32) -> Result<()> {
        Ok(self.mouse()?.button(button, value)?)
    }

    fn scroll(&mut self, amount: i32) -> Result<()> {
        Ok(self.mouse()?.scroll(amount)?)
    }

    fn close_pointer(&mut self) -> Result<()> {
        if self.mouse.take().is_some() {
            debug!("Virtual mouse destroyed");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.gamepad.take().is_some() {
            debug!("Virtual gamepad destroyed");
        }
        Ok(())
    }
}
