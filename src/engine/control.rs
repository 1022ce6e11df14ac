//! Runtime controls shared between the engine thread and its owner.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::axis::{clamp_mouse_sensitivity, clamp_stick_sensitivity};
use crate::profile::Mode;

/// Settings the engine reads once per batch of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSnapshot {
    pub mode: Mode,
    pub mouse_mode: bool,
    /// Percent, 10..=500
    pub stick_sensitivity: u32,
    /// Percent, 10..=600
    pub mouse_sensitivity: u32,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            mode: Mode::Analog,
            mouse_mode: false,
            stick_sensitivity: 100,
            mouse_sensitivity: 100,
        }
    }
}

#[derive(Debug)]
struct ControlState {
    stop: AtomicBool,
    mouse_mode: AtomicBool,
    digital: AtomicBool,
    stick_sensitivity: AtomicU32,
    mouse_sensitivity: AtomicU32,
    generation: AtomicU32,
}

/// Cloneable handle for stopping and tuning a running engine.
///
/// Every setter is safe to call from any thread while the engine runs;
/// the engine picks changes up on its next batch.
#[derive(Debug, Clone)]
pub struct EngineControl {
    state: Arc<ControlState>,
}

impl Default for EngineControl {
    fn default() -> Self {
        Self::new(ControlSnapshot::default())
    }
}

impl EngineControl {
    #[must_use]
    pub fn new(initial: ControlSnapshot) -> Self {
        Self {
            state: Arc::new(ControlState {
                stop: AtomicBool::new(false),
                mouse_mode: AtomicBool::new(initial.mouse_mode),
                digital: AtomicBool::new(initial.mode == Mode::Digital),
                stick_sensitivity: AtomicU32::new(clamp_stick_sensitivity(initial.stick_sensitivity)),
                mouse_sensitivity: AtomicU32::new(clamp_mouse_sensitivity(initial.mouse_sensitivity)),
                generation: AtomicU32::new(0),
            }),
        }
    }

    /// Asks the engine to leave its loop and clean up.
    pub fn stop(&self) {
        self.state.stop.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.state.stop.load(Ordering::SeqCst)
    }

    pub fn set_mode(&self, mode: Mode) {
        self.state.digital.store(mode == Mode::Digital, Ordering::Relaxed);
        self.bump();
    }

    pub fn set_mouse_mode(&self, enabled: bool) {
        self.state.mouse_mode.store(enabled, Ordering::Relaxed);
        self.bump();
    }

    /// Stores the clamped value and returns it.
    pub fn set_stick_sensitivity(&self, percent: u32) -> u32 {
        let percent = clamp_stick_sensitivity(percent);
        self.state.stick_sensitivity.store(percent, Ordering::Relaxed);
        self.bump();
        percent
    }

    /// Stores the clamped value and returns it.
    pub fn set_mouse_sensitivity(&self, percent: u32) -> u32 {
        let percent = clamp_mouse_sensitivity(percent);
        self.state.mouse_sensitivity.store(percent, Ordering::Relaxed);
        self.bump();
        percent
    }

    /// Counter bumped by every setter; lets the engine log changes once.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.state.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.state.generation.fetch_add(1, Ordering::Release);
    }

    #[must_use]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: if self.state.digital.load(Ordering::Relaxed) {
                Mode::Digital
            } else {
                Mode::Analog
            },
            mouse_mode: self.state.mouse_mode.load(Ordering::Relaxed),
            stick_sensitivity: self.state.stick_sensitivity.load(Ordering::Relaxed),
            mouse_sensitivity: self.state.mouse_sensitivity.load(Ordering::Relaxed),
        }
    }
}

/// Engine progress as reported to whoever started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    DeviceFound(String),
    VirtualDeviceCreated,
    Running,
    Stopped,
    Error(String),
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Idle => write!(f, "Idle"),
            EngineStatus::DeviceFound(path) => write!(f, "Device found: {}", path),
            EngineStatus::VirtualDeviceCreated => write!(f, "Virtual gamepad created"),
            EngineStatus::Running => write!(f, "Running"),
            EngineStatus::Stopped => write!(f, "Stopped"),
            EngineStatus::Error(description) => write!(f, "Error: {}", description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot_is_clamped() {
        let control = EngineControl::new(ControlSnapshot {
            mode: Mode::Digital,
            mouse_mode: true,
            stick_sensitivity: 5,
            mouse_sensitivity: 9000,
        });
        let snapshot = control.snapshot();
        assert_eq!(snapshot.mode, Mode::Digital);
        assert!(snapshot.mouse_mode);
        assert_eq!(snapshot.stick_sensitivity, 10);
        assert_eq!(snapshot.mouse_sensitivity, 600);
    }

    #[test]
    fn test_setters_visible_through_clones() {
        let control = EngineControl::default();
        let remote = control.clone();

        remote.set_mode(Mode::Digital);
        remote.set_mouse_mode(true);
        assert_eq!(remote.set_stick_sensitivity(250), 250);
        assert_eq!(remote.set_mouse_sensitivity(1), 10);

        let snapshot = control.snapshot();
        assert_eq!(snapshot.mode, Mode::Digital);
        assert!(snapshot.mouse_mode);
        assert_eq!(snapshot.stick_sensitivity, 250);
        assert_eq!(snapshot.mouse_sensitivity, 10);
    }

    #[test]
    fn test_stop_flag() {
        let control = EngineControl::default();
        assert!(!control.is_stop_requested());
        control.clone().stop();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn test_generation_changes_on_set() {
        let control = EngineControl::default();
        let before = control.generation();
        control.set_mouse_mode(true);
        assert_ne!(control.generation(), before);
    }

    #[test]
    fn test_generation_does_not_repeat_after_many_sets() {
        let control = EngineControl::default();
        let before = control.generation();
        for _ in 0..256 {
            control.set_stick_sensitivity(150);
        }
        assert_ne!(control.generation(), before);
        assert_eq!(control.generation(), before + 256);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            EngineStatus::DeviceFound("/dev/input/event3".to_string()).to_string(),
            "Device found: /dev/input/event3"
        );
        assert_eq!(EngineStatus::VirtualDeviceCreated.to_string(), "Virtual gamepad created");
        assert_eq!(EngineStatus::Running.to_string(), "Running");
        assert_eq!(EngineStatus::Stopped.to_string(), "Stopped");
        assert_eq!(
            EngineStatus::Error("device unplugged".to_string()).to_string(),
            "Error: device unplugged"
        );
    }
}
