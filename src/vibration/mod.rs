//! # Vibration Module
//!
//! Plays test rumble effects on the physical device.
//!
//! The kernel keeps uploaded effects in a small per-device table. The
//! manager reuses one slot for every test; if the kernel reports the table
//! full (`ENOSPC`) while a slot is cached, the slot is dropped and the upload
//! retried once with a fresh allocation.
//!
//! ## Usage
//!
//! ```no_run
//! use joypad_remap::device::DeviceSelector;
//! use joypad_remap::vibration::{Motor, VibrationManager};
//!
//! let mut vibration = VibrationManager::locate(&DeviceSelector::auto());
//! vibration.set_intensity(60);
//! vibration.test(Motor::Both)?;
//! # Ok::<(), joypad_remap::error::RemapError>(())
//! ```

pub mod rumble;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{RemapError, Result};

pub use rumble::{locate, EvdevRumble};

/// Shortest test effect.
pub const MIN_DURATION_MS: u32 = 100;
/// Highest intensity, percent.
pub const MAX_INTENSITY: u8 = 100;

/// Which motor(s) a test drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motor {
    /// Strong (low-frequency) motor
    Left,
    /// Weak (high-frequency) motor
    Right,
    #[default]
    Both,
}

impl FromStr for Motor {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "strong" => Ok(Motor::Left),
            "right" | "weak" => Ok(Motor::Right),
            "both" => Ok(Motor::Both),
            other => Err(RemapError::ConfigValue(format!(
                "unknown motor '{}' (expected left, right or both)",
                other
            ))),
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Motor::Left => "left",
            Motor::Right => "right",
            Motor::Both => "both",
        };
        f.write_str(name)
    }
}

/// Kernel effect table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSlot(pub i16);

/// A rumble effect ready for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RumbleEffect {
    pub strong_magnitude: u16,
    pub weak_magnitude: u16,
    pub duration_ms: u16,
}

/// A device that can store and play rumble effects.
#[cfg_attr(test, mockall::automock)]
pub trait RumbleDevice {
    /// Uploads `effect`, reusing `slot` when given.
    ///
    /// Returns the slot the kernel assigned.
    fn upload(&mut self, effect: &RumbleEffect, slot: Option<EffectSlot>) -> io::Result<EffectSlot>;

    /// Plays the effect stored in `slot` once.
    fn play(&mut self, slot: EffectSlot) -> io::Result<()>;
}

/// Effect table exhausted.
fn is_table_full(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::ENOSPC)
}

/// Owns the rumble device and the cached effect slot.
pub struct VibrationManager<D: RumbleDevice> {
    device: Option<D>,
    slot: Option<EffectSlot>,
    enabled: bool,
    intensity: u8,
    duration_ms: u32,
}

impl<D: RumbleDevice> fmt::Debug for VibrationManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VibrationManager")
            .field("has_device", &self.device.is_some())
            .field("slot", &self.slot)
            .field("enabled", &self.enabled)
            .field("intensity", &self.intensity)
            .field("duration_ms", &self.duration_ms)
            .finish()
    }
}

impl<D: RumbleDevice> Default for VibrationManager<D> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<D: RumbleDevice> VibrationManager<D> {
    /// Enabled, full intensity, one second.
    #[must_use]
    pub fn new(device: Option<D>) -> Self {
        Self {
            device,
            slot: None,
            enabled: true,
            intensity: MAX_INTENSITY,
            duration_ms: 1000,
        }
    }

    /// Replaces the device. The cached slot belonged to the old one.
    pub fn attach(&mut self, device: Option<D>) {
        self.device = device;
        self.slot = None;
    }

    #[must_use]
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    #[must_use]
    pub fn slot(&self) -> Option<EffectSlot> {
        self.slot
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clamped to 0..=100.
    pub fn set_intensity(&mut self, percent: u8) {
        self.intensity = percent.min(MAX_INTENSITY);
    }

    #[must_use]
    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    /// Raised to at least [`MIN_DURATION_MS`].
    pub fn set_duration(&mut self, duration_ms: u32) {
        self.duration_ms = duration_ms.max(MIN_DURATION_MS);
    }

    #[must_use]
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Motor magnitude for the current intensity, 0..=0xffff.
    #[must_use]
    pub fn magnitude(&self) -> u16 {
        (u32::from(self.intensity) * u32::from(u16::MAX) / u32::from(MAX_INTENSITY)) as u16
    }

    #[must_use]
    pub fn effect_for(&self, motor: Motor) -> RumbleEffect {
        let magnitude = self.magnitude();
        let (strong_magnitude, weak_magnitude) = match motor {
            Motor::Left => (magnitude, 0),
            Motor::Right => (0, magnitude),
            Motor::Both => (magnitude, magnitude),
        };
        RumbleEffect {
            strong_magnitude,
            weak_magnitude,
            duration_ms: self.duration_ms.min(u32::from(u16::MAX)) as u16,
        }
    }

    /// Plays one test effect.
    ///
    /// A no-op when disabled or when no vibration-capable device is attached.
    ///
    /// # Errors
    ///
    /// `ForceFeedback` if the upload (after the single retry) or playback fails.
    pub fn test(&mut self, motor: Motor) -> Result<()> {
        if !self.enabled {
            debug!("Vibration disabled, skipping test");
            return Ok(());
        }
        let effect = self.effect_for(motor);
        let Some(device) = self.device.as_mut() else {
            info!("No vibration device found");
            return Ok(());
        };

        let slot = match device.upload(&effect, self.slot) {
            Ok(slot) => slot,
            Err(e) if is_table_full(&e) && self.slot.is_some() => {
                warn!("Effect table full, releasing cached slot and retrying");
                self.slot = None;
                device.upload(&effect, None).map_err(RemapError::ForceFeedback)?
            }
            Err(e) => return Err(RemapError::ForceFeedback(e)),
        };
        self.slot = Some(slot);

        device.play(slot).map_err(RemapError::ForceFeedback)?;
        debug!(
            "Rumble {} at {}% for {} ms (slot {})",
            motor, self.intensity, effect.duration_ms, slot.0
        );
        Ok(())
    }
}

impl VibrationManager<EvdevRumble> {
    /// Manager bound to whatever [`locate`] finds for `selector`.
    #[must_use]
    pub fn locate(selector: &crate::device::DeviceSelector) -> Self {
        Self::new(locate(selector))
    }

    /// Re-resolves the device, preferring `path`.
    pub fn set_device_path(&mut self, path: Option<std::path::PathBuf>) {
        let selector = crate::device::DeviceSelector {
            path,
            ..crate::device::DeviceSelector::auto()
        };
        self.attach(locate(&selector));
    }

    /// True if a running engine (or any other reader) has the device
    /// grabbed, in which case test effects cannot be heard.
    pub fn is_device_grabbed_elsewhere(&mut self) -> bool {
        self.device
            .as_mut()
            .map_or(false, EvdevRumble::is_grabbed_elsewhere)
    }
}
