//! Force-feedback effects on a real evdev device.

use evdev::{Device, FFEffect, FFEffectData, FFEffectKind, FFReplay, FFTrigger};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{EffectSlot, RumbleDevice, RumbleEffect};
use crate::device::{scanner, DeviceSelector};

impl RumbleEffect {
    fn to_ff_data(self) -> FFEffectData {
        FFEffectData {
            direction: 0,
            trigger: FFTrigger {
                button: 0,
                interval: 0,
            },
            replay: FFReplay {
                length: self.duration_ms,
                delay: 0,
            },
            kind: FFEffectKind::Rumble {
                strong_magnitude: self.strong_magnitude,
                weak_magnitude: self.weak_magnitude,
            },
        }
    }
}

/// Rumble via the kernel force-feedback interface.
///
/// Holds at most one uploaded effect; dropping it erases the slot.
pub struct EvdevRumble {
    path: PathBuf,
    device: Device,
    effect: Option<FFEffect>,
}

impl std::fmt::Debug for EvdevRumble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevRumble")
            .field("path", &self.path)
            .field("slot", &self.effect.as_ref().map(FFEffect::id))
            .finish()
    }
}

impl EvdevRumble {
    pub fn new(path: PathBuf, device: Device) -> Self {
        Self {
            path,
            device,
            effect: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if another handle holds an exclusive grab on the device.
    ///
    /// The kernel drops force-feedback writes from every handle except the
    /// grabbing one, so effects played through this handle would be silent.
    /// Checked by grabbing and immediately releasing the device.
    pub fn is_grabbed_elsewhere(&mut self) -> bool {
        match self.device.grab() {
            Ok(()) => {
                if let Err(e) = self.device.ungrab() {
                    warn!("Failed to release {}: {}", self.path.display(), e);
                }
                false
            }
            Err(e) => is_foreign_grab(&e),
        }
    }
}

/// `EVIOCGRAB` reports `EBUSY` while a different handle holds the grab.
fn is_foreign_grab(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EBUSY)
}

impl RumbleDevice for EvdevRumble {
    fn upload(&mut self, effect: &RumbleEffect, slot: Option<EffectSlot>) -> io::Result<EffectSlot> {
        let data = effect.to_ff_data();

        if let (Some(slot), Some(current)) = (slot, self.effect.as_mut()) {
            if current.id() as i16 == slot.0 {
                current.update(data)?;
                return Ok(slot);
            }
        }

        // Free the previous slot before asking for a new one
        self.effect = None;
        let uploaded = self.device.upload_ff_effect(data)?;
        let slot = EffectSlot(uploaded.id() as i16);
        debug!("Uploaded rumble effect to slot {} on {}", slot.0, self.path.display());
        self.effect = Some(uploaded);
        Ok(slot)
    }

    fn play(&mut self, slot: EffectSlot) -> io::Result<()> {
        match self.effect.as_mut() {
            Some(effect) if effect.id() as i16 == slot.0 => effect.play(1),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no effect uploaded in slot {}", slot.0),
            )),
        }
    }
}

/// Finds a vibration-capable device.
///
/// Prefers the device `selector` resolves to; otherwise the first device,
/// by path, that supports force feedback.
pub fn locate(selector: &DeviceSelector) -> Option<EvdevRumble> {
    if let Some(found) = scanner::find(selector) {
        if found.info().force_feedback {
            let (info, device) = found.into_parts();
            if let Some(device) = device {
                info!("Vibration device: {} '{}'", info.path.display(), info.name);
                return Some(EvdevRumble::new(info.path, device));
            }
        } else {
            debug!("{} has no force feedback", found.path().display());
        }
    }

    scanner::enumerate()
        .into_iter()
        .find(|(info, _)| info.force_feedback)
        .map(|(info, device)| {
            info!("Vibration device: {} '{}'", info.path.display(), info.name);
            EvdevRumble::new(info.path, device)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_conversion() {
        let effect = RumbleEffect {
            strong_magnitude: 0xffff,
            weak_magnitude: 0x1000,
            duration_ms: 750,
        };
        let data = effect.to_ff_data();
        assert_eq!(data.replay.length, 750);
        assert_eq!(data.replay.delay, 0);
        match data.kind {
            FFEffectKind::Rumble {
                strong_magnitude,
                weak_magnitude,
            } => {
                assert_eq!(strong_magnitude, 0xffff);
                assert_eq!(weak_magnitude, 0x1000);
            }
            _ => panic!("expected a rumble effect"),
        }
    }

    #[test]
    fn test_foreign_grab_detection() {
        assert!(is_foreign_grab(&io::Error::from_raw_os_error(libc::EBUSY)));
        assert!(!is_foreign_grab(&io::Error::from_raw_os_error(libc::EACCES)));
        assert!(!is_foreign_grab(&io::Error::new(io::ErrorKind::Other, "closed")));
    }

    // Integration test - requires a force-feedback capable gamepad
    #[test]
    #[ignore]
    fn test_rumble_real_device() {
        let mut rumble = locate(&DeviceSelector::auto()).expect("no vibration device");
        let effect = RumbleEffect {
            strong_magnitude: 0x8000,
            weak_magnitude: 0x8000,
            duration_ms: 200,
        };
        let slot = rumble.upload(&effect, None).unwrap();
        rumble.play(slot).unwrap();
        assert_eq!(rumble.upload(&effect, Some(slot)).unwrap(), slot);
    }
}
