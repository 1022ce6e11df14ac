//! # Physical Device
//!
//! An opened input device plus the snapshot it was selected by.
//!
//! The engine reads it through [`InputSource`]: grabbing switches the
//! descriptor to non-blocking so the loop can keep checking its stop flag.

use evdev::{Device, InputEventKind};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use tracing::{debug, warn};

use super::DeviceInfo;
use crate::engine::{InputSource, PhysicalEvent};

/// A selected, opened input device.
pub struct PhysicalDevice {
    info: DeviceInfo,
    device: Option<Device>,
    grabbed: bool,
}

impl std::fmt::Debug for PhysicalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDevice")
            .field("path", &self.info.path)
            .field("open", &self.device.is_some())
            .field("grabbed", &self.grabbed)
            .finish()
    }
}

impl PhysicalDevice {
    pub(crate) fn new(info: DeviceInfo, device: Device) -> Self {
        Self {
            info,
            device: Some(device),
            grabbed: false,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    /// Splits into snapshot and handle, e.g. to reuse the handle for force feedback.
    ///
    /// Returns `None` for the handle once the device has been closed.
    pub fn into_parts(mut self) -> (DeviceInfo, Option<Device>) {
        if let Err(e) = self.ungrab() {
            warn!("Failed to release {}: {}", self.info.path.display(), e);
        }
        let device = self.device.take();
        (self.info.clone(), device)
    }

    fn device_mut(&mut self) -> io::Result<&mut Device> {
        self.device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "device already closed"))
    }
}

/// Switches a descriptor to non-blocking reads, keeping its other flags.
fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd belongs to `device`, which outlives both calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl InputSource for PhysicalDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn grab(&mut self) -> io::Result<()> {
        let device = self.device_mut()?;
        set_nonblocking(device)?;
        device.grab()?;
        self.grabbed = true;
        Ok(())
    }

    fn ungrab(&mut self) -> io::Result<()> {
        if !self.grabbed {
            return Ok(());
        }
        // Cleared first so a failed ungrab is not retried on a dead device
        self.grabbed = false;
        self.device_mut()?.ungrab()
    }

    fn read_events(&mut self, events: &mut Vec<PhysicalEvent>) -> io::Result<()> {
        let device = self.device_mut()?;
        match device.fetch_events() {
            Ok(batch) => {
                for event in batch {
                    match event.kind() {
                        InputEventKind::Key(key) => events.push(PhysicalEvent::Key {
                            code: key.code(),
                            value: event.value(),
                        }),
                        InputEventKind::AbsAxis(axis) => events.push(PhysicalEvent::Absolute {
                            code: axis.0,
                            value: event.value(),
                        }),
                        _ => {}
                    }
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.device.take().is_some() {
            debug!("Closed input device {}", self.info.path.display());
        }
        Ok(())
    }
}

impl Drop for PhysicalDevice {
    fn drop(&mut self) {
        if let Err(e) = self.ungrab() {
            warn!("Failed to release {}: {}", self.info.path.display(), e);
        }
    }
}
