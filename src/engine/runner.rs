//! # Engine Runner
//!
//! Owns one physical source and one output sink for a single session.
//!
//! [`Engine::run`] blocks the calling thread until the stop flag is set or
//! the device fails, so callers run it on a dedicated thread and stop it
//! through a cloned [`EngineControl`].

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::control::{EngineControl, EngineStatus};
use super::dispatch::{Action, Dispatcher, PhysicalEvent};
use super::layout::layout_for;
use super::InputSource;
use crate::device::{scanner, DeviceSelector, PhysicalDevice};
use crate::error::{RemapError, Result};
use crate::output::{OutputSink, VirtualOutput};
use crate::profile::ProfileStore;

/// Default grab attempts before giving up.
pub const DEFAULT_GRAB_ATTEMPTS: u32 = 10;
/// Default pause between grab attempts.
pub const DEFAULT_GRAB_BACKOFF: Duration = Duration::from_millis(100);
/// Default sleep when a poll returns nothing.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Timing knobs for one engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub grab_attempts: u32,
    pub grab_backoff: Duration,
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grab_attempts: DEFAULT_GRAB_ATTEMPTS,
            grab_backoff: DEFAULT_GRAB_BACKOFF,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Grabbing,
    Running,
    Stopping,
    Cleaned,
}

/// `EBUSY`, `EAGAIN` and would-block mean "try again later".
fn is_transient(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || matches!(error.raw_os_error(), Some(code) if code == libc::EBUSY || code == libc::EAGAIN)
}

/// The input processing engine for one device session.
pub struct Engine<S: InputSource, O: OutputSink> {
    source: S,
    output: O,
    profile: Arc<ProfileStore>,
    control: EngineControl,
    settings: EngineSettings,
    status: watch::Sender<EngineStatus>,
    state: EngineState,
}

impl<S: InputSource, O: OutputSink> std::fmt::Debug for Engine<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("device", &self.source.info().path)
            .field("state", &self.state)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine<PhysicalDevice, VirtualOutput> {
    /// Finds the device and creates the virtual gamepad, reporting each step.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: nothing matched `selector`
    /// - `VirtualDevice`: uinput refused the gamepad
    pub fn open(
        selector: &DeviceSelector,
        profile: Arc<ProfileStore>,
        control: EngineControl,
        settings: EngineSettings,
        status: watch::Sender<EngineStatus>,
    ) -> Result<Self> {
        let device = match scanner::find(selector) {
            Some(device) => device,
            None => {
                let err = RemapError::DeviceNotFound(selector.describe());
                status.send_replace(EngineStatus::Error(err.to_string()));
                return Err(err);
            }
        };
        status.send_replace(EngineStatus::DeviceFound(device.path().display().to_string()));

        if profile.is_empty() {
            warn!(
                "Mapping profile {} has no mappings; buttons will not reach the virtual gamepad",
                profile.path().display()
            );
        }

        let output = match VirtualOutput::create() {
            Ok(output) => output,
            Err(err) => {
                status.send_replace(EngineStatus::Error(err.to_string()));
                return Err(err);
            }
        };
        status.send_replace(EngineStatus::VirtualDeviceCreated);

        Ok(Self::new(device, output, profile, control, settings, status))
    }
}

impl<S: InputSource, O: OutputSink> Engine<S, O> {
    pub fn new(
        source: S,
        output: O,
        profile: Arc<ProfileStore>,
        control: EngineControl,
        settings: EngineSettings,
        status: watch::Sender<EngineStatus>,
    ) -> Self {
        Self {
            source,
            output,
            profile,
            control,
            settings,
            status,
            state: EngineState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn control(&self) -> &EngineControl {
        &self.control
    }

    /// New receiver for status updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    /// Grabs the device, processes events until stopped, then cleans up.
    ///
    /// Cleanup runs on every exit path. The final status is `Stopped` on a
    /// requested stop and `Error(..)` otherwise.
    ///
    /// # Errors
    ///
    /// - `Grab`: exclusive access not acquired within the retry budget
    /// - `Io`: the device failed while reading (e.g. unplugged)
    pub fn run(&mut self) -> Result<()> {
        if self.state == EngineState::Cleaned {
            return Err(RemapError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "engine session already finished",
            )));
        }

        let result = self.grab().and_then(|()| self.poll_loop());
        self.cleanup();

        match &result {
            Ok(()) => {
                info!("Engine stopped");
                self.status.send_replace(EngineStatus::Stopped);
            }
            Err(e) => {
                error!("Engine failed: {}", e);
                self.status.send_replace(EngineStatus::Error(e.to_string()));
            }
        }
        result
    }

    fn grab(&mut self) -> Result<()> {
        self.state = EngineState::Grabbing;
        let path = self.source.info().path.display().to_string();
        let attempts = self.settings.grab_attempts.max(1);

        for attempt in 1..=attempts {
            match self.source.grab() {
                Ok(()) => {
                    info!("Grabbed {} (attempt {}/{})", path, attempt, attempts);
                    return Ok(());
                }
                Err(e) if is_transient(&e) && attempt < attempts => {
                    debug!("Grab of {} busy (attempt {}/{}): {}", path, attempt, attempts, e);
                    thread::sleep(self.settings.grab_backoff);
                }
                Err(e) => {
                    return Err(RemapError::Grab {
                        path,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }

        // attempts >= 1, so the loop always returns
        Err(RemapError::Grab {
            path,
            attempts,
            source: io::Error::from(io::ErrorKind::WouldBlock),
        })
    }

    fn poll_loop(&mut self) -> Result<()> {
        self.state = EngineState::Running;
        self.status.send_replace(EngineStatus::Running);

        let info = self.source.info();
        let layout = layout_for(info);
        info!("Processing events from {} ({} layout)", info.path.display(), layout.name);
        let mut dispatcher = Dispatcher::new(layout, info.axes.clone());

        let mut events: Vec<PhysicalEvent> = Vec::with_capacity(64);
        let mut generation = self.control.generation();

        loop {
            if self.control.is_stop_requested() {
                self.state = EngineState::Stopping;
                debug!("Stop requested");
                return Ok(());
            }

            events.clear();
            match self.source.read_events(&mut events) {
                Ok(()) => {}
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(RemapError::Io(e)),
            }

            if events.is_empty() {
                thread::sleep(self.settings.poll_interval);
                continue;
            }

            let profile = self.profile.snapshot();
            let control = self.control.snapshot();
            if self.control.generation() != generation {
                generation = self.control.generation();
                info!(
                    "Controls updated: mode={} mouse_mode={} stick={}% mouse={}%",
                    control.mode, control.mouse_mode, control.stick_sensitivity, control.mouse_sensitivity
                );
            }

            for event in events.drain(..) {
                for action in dispatcher.dispatch(event, &profile, &control) {
                    if let Err(e) = apply(&mut self.output, action) {
                        warn!("Failed to emit {:?}: {}", action, e);
                    }
                }
            }
        }
    }

    /// Releases everything the session holds. Safe to call repeatedly.
    ///
    /// Each step is attempted even if an earlier one fails.
    pub fn cleanup(&mut self) {
        if self.state == EngineState::Cleaned {
            return;
        }

        if let Err(e) = self.source.ungrab() {
            warn!("Failed to ungrab device: {}", e);
        }
        if let Err(e) = self.source.close() {
            warn!("Failed to close device: {}", e);
        }
        if let Err(e) = self.output.close_pointer() {
            warn!("Failed to destroy virtual mouse: {}", e);
        }
        if let Err(e) = self.output.close() {
            warn!("Failed to destroy virtual gamepad: {}", e);
        }

        self.state = EngineState::Cleaned;
        debug!("Engine resources released");
    }
}

impl<S: InputSource, O: OutputSink> Drop for Engine<S, O> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn apply<O: OutputSink>(output: &mut O, action: Action) -> Result<()> {
    match action {
        Action::EmitButton { code, value } => output.emit_button(code, value),
        Action::EmitAxis { code, value } => output.emit_axis(code, value),
        Action::MouseMove { dx, dy } => output.move_pointer(dx, dy),
        Action::MouseClick { button, value } => output.click(button, value),
        Action::Scroll { amount } => output.scroll(amount),
    }
}
