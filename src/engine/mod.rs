//! # Engine Module
//!
//! The input processing engine: grab the physical device, read its events,
//! translate them through the active profile and write the results to the
//! virtual devices.
//!
//! This module handles:
//! - Axis normalization, deadzone and sensitivity ([`axis`])
//! - Per-device stick role tables ([`layout`])
//! - Pure event-to-action translation ([`dispatch`])
//! - Thread-safe runtime controls and status ([`control`])
//! - The grab / poll / cleanup lifecycle ([`runner`])
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──grab──> Grabbing ──ok──> Running ──stop/error──> Stopping ──> Cleaned
//!                   └──────────── retries exhausted ─────────────────────┘
//! ```

pub mod axis;
pub mod control;
pub mod dispatch;
pub mod layout;
pub mod runner;

use std::io;

use crate::device::DeviceInfo;

pub use control::{ControlSnapshot, EngineControl, EngineStatus};
pub use dispatch::{Action, Dispatcher, PhysicalEvent};
pub use layout::{layout_for, AxisLayout, AxisRole};
pub use runner::{Engine, EngineSettings, EngineState};

/// Where the engine reads physical events from.
pub trait InputSource {
    /// Snapshot the device was selected by.
    fn info(&self) -> &DeviceInfo;

    /// Takes exclusive access; `EBUSY`/`EAGAIN` are treated as retryable.
    fn grab(&mut self) -> io::Result<()>;

    /// Releases exclusive access. A no-op when not grabbed.
    fn ungrab(&mut self) -> io::Result<()>;

    /// Appends whatever is pending without blocking.
    fn read_events(&mut self, events: &mut Vec<PhysicalEvent>) -> io::Result<()>;

    /// Closes the handle. Later calls are no-ops.
    fn close(&mut self) -> io::Result<()>;
}
