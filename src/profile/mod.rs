//! # Mapping Profile Module
//!
//! The two-mode translation table from physical codes to virtual names.
//!
//! ## Document Layout
//!
//! ```text
//! {
//!   "analog":  { "buttons": { "304": "BTN_A" }, "axes": { "16:-1": "BTN_DPAD_LEFT" } },
//!   "digital": { "buttons": {},                 "axes": {} }
//! }
//! ```
//!
//! Button keys are the decimal physical key code. Axis keys are the decimal
//! axis code, optionally followed by `:-1` or `:1` to bind one direction of a
//! hat axis as a momentary button.

pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RemapError;

pub use store::{LoadOutcome, ProfileStore};

/// Mapping mode selecting which half of the profile is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Analog keyset (default)
    #[default]
    Analog,
    /// Digital keyset
    Digital,
}

impl Mode {
    /// Both modes, in document order.
    pub const ALL: [Mode; 2] = [Mode::Analog, Mode::Digital];

    /// Returns the document key for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Analog => "analog",
            Mode::Digital => "digital",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analog" => Ok(Mode::Analog),
            "digital" => Ok(Mode::Digital),
            other => Err(RemapError::UnknownMode(other.to_string())),
        }
    }
}

/// One direction of a hat-style axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisDirection {
    /// Value -1 (left / up)
    Negative,
    /// Value +1 (right / down)
    Positive,
}

impl AxisDirection {
    /// Maps a discrete axis value to a direction; 0 has none.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value.signum() {
            -1 => Some(AxisDirection::Negative),
            1 => Some(AxisDirection::Positive),
            _ => None,
        }
    }

    /// The signed value this direction represents.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            AxisDirection::Negative => -1,
            AxisDirection::Positive => 1,
        }
    }
}

impl FromStr for AxisDirection {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-1" => Ok(AxisDirection::Negative),
            "1" | "+1" => Ok(AxisDirection::Positive),
            other => Err(RemapError::ConfigValue(format!(
                "axis direction must be -1 or 1, got '{}'",
                other
            ))),
        }
    }
}

/// Builds the document key for an axis binding.
fn axis_key(code: u16, direction: Option<AxisDirection>) -> String {
    match direction {
        Some(dir) => format!("{}:{}", code, dir.value()),
        None => code.to_string(),
    }
}

/// Bindings of a single mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeMap {
    /// Physical key code (as string) to virtual name
    #[serde(default)]
    pub buttons: BTreeMap<String, String>,
    /// Physical axis code, optionally `code:direction`, to virtual name
    #[serde(default)]
    pub axes: BTreeMap<String, String>,
}

impl ModeMap {
    /// True when neither buttons nor axes are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.axes.is_empty()
    }
}

/// The full two-mode mapping profile.
///
/// Both modes always exist; missing halves of a persisted document
/// deserialize as empty.
///
/// # Examples
///
/// ```
/// use joypad_remap::profile::{AxisDirection, MappingProfile, Mode};
///
/// let mut profile = MappingProfile::default();
/// profile.set_button(Mode::Analog, 304, "BTN_A");
/// profile.set_axis(Mode::Analog, 16, Some(AxisDirection::Negative), "BTN_DPAD_LEFT");
///
/// assert_eq!(profile.translate_button(Mode::Analog, 304), Some("BTN_A"));
/// assert_eq!(profile.translate_button(Mode::Digital, 304), None);
/// assert!(profile.has_axis_direction_mappings(Mode::Analog, 16));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingProfile {
    #[serde(default)]
    pub analog: ModeMap,
    #[serde(default)]
    pub digital: ModeMap,
}

impl MappingProfile {
    /// Returns the bindings for `mode`.
    #[must_use]
    pub fn mode(&self, mode: Mode) -> &ModeMap {
        match mode {
            Mode::Analog => &self.analog,
            Mode::Digital => &self.digital,
        }
    }

    fn mode_mut(&mut self, mode: Mode) -> &mut ModeMap {
        match mode {
            Mode::Analog => &mut self.analog,
            Mode::Digital => &mut self.digital,
        }
    }

    /// Binds a physical key code to a virtual name, replacing any previous binding.
    pub fn set_button(&mut self, mode: Mode, code: u16, virtual_name: impl Into<String>) {
        self.mode_mut(mode)
            .buttons
            .insert(code.to_string(), virtual_name.into());
    }

    /// Binds a physical axis (or one direction of it) to a virtual name.
    pub fn set_axis(
        &mut self,
        mode: Mode,
        code: u16,
        direction: Option<AxisDirection>,
        virtual_name: impl Into<String>,
    ) {
        self.mode_mut(mode)
            .axes
            .insert(axis_key(code, direction), virtual_name.into());
    }

    /// Looks up the virtual name bound to a physical key code.
    #[must_use]
    pub fn translate_button(&self, mode: Mode, code: u16) -> Option<&str> {
        self.mode(mode)
            .buttons
            .get(&code.to_string())
            .map(String::as_str)
    }

    /// Looks up the virtual name bound to a physical axis.
    ///
    /// With a direction only the direction-qualified key is consulted; there
    /// is no fallback to the plain axis key.
    #[must_use]
    pub fn translate_axis(
        &self,
        mode: Mode,
        code: u16,
        direction: Option<AxisDirection>,
    ) -> Option<&str> {
        self.mode(mode)
            .axes
            .get(&axis_key(code, direction))
            .map(String::as_str)
    }

    /// True if any direction-qualified binding exists for the axis.
    #[must_use]
    pub fn has_axis_direction_mappings(&self, mode: Mode, code: u16) -> bool {
        let prefix = format!("{}:", code);
        self.mode(mode).axes.keys().any(|key| key.starts_with(&prefix))
    }

    /// True iff both modes have no bindings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Mode::ALL.iter().all(|&mode| self.mode(mode).is_empty())
    }
}
