//! # Device Module
//!
//! Physical input device discovery via evdev.
//!
//! This module handles:
//! - Snapshotting a device's identity and capabilities ([`DeviceInfo`])
//! - Scoring devices by how gamepad-like they look
//! - Resolving the target device by path, identity, name or best score
//! - The evdev-backed [`PhysicalDevice`] the engine grabs and reads

pub mod physical;
pub mod scanner;

use evdev::{Device, EventType};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::RemapError;

pub use physical::PhysicalDevice;
pub use scanner::{find, list_supported, score, select, DeviceSelector, ScoredDevice};

/// USB vendor/product pair identifying a device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor: u16,
    pub product: u16,
}

impl DeviceIdentity {
    #[must_use]
    pub fn new(vendor: u16, product: u16) -> Self {
        Self { vendor, product }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.product)
    }
}

impl FromStr for DeviceIdentity {
    type Err = RemapError;

    /// Parses `VVVV:PPPP` (hex, as printed by `lsusb`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RemapError::ConfigValue(format!("invalid device id '{}', expected VVVV:PPPP", s));
        let (vendor, product) = s.trim().split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            vendor: parse_hex_id(vendor).ok_or_else(invalid)?,
            product: parse_hex_id(product).ok_or_else(invalid)?,
        })
    }
}

/// Parses a 16-bit hex id, with or without a `0x` prefix.
pub(crate) fn parse_hex_id(text: &str) -> Option<u16> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).ok()
}

/// Absolute axis metadata as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisInfo {
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AxisInfo {
    #[must_use]
    pub fn new(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            ..Self::default()
        }
    }
}

/// Identity and capability snapshot of one input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// `/dev/input/eventX` path
    pub path: PathBuf,
    /// Kernel-reported name
    pub name: String,
    pub identity: DeviceIdentity,
    /// Supported key/button codes
    pub keys: BTreeSet<u16>,
    /// Supported absolute axes with their metadata
    pub axes: BTreeMap<u16, AxisInfo>,
    /// Whether the device accepts force-feedback effects
    pub force_feedback: bool,
}

impl DeviceInfo {
    /// Reads identity and capabilities from an opened evdev device.
    #[must_use]
    pub fn from_device(path: &Path, device: &Device) -> Self {
        let id = device.input_id();

        let keys = device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| key.code()).collect())
            .unwrap_or_default();

        // Axis metadata is best-effort; a failed query still leaves the codes.
        let abs_state = device.get_abs_state().ok();
        let axes = device
            .supported_absolute_axes()
            .map(|axes| {
                axes.iter()
                    .map(|axis| {
                        let info = abs_state
                            .as_ref()
                            .and_then(|state| state.get(axis.0 as usize))
                            .map(|abs| AxisInfo {
                                minimum: abs.minimum,
                                maximum: abs.maximum,
                                fuzz: abs.fuzz,
                                flat: abs.flat,
                                resolution: abs.resolution,
                            })
                            .unwrap_or_default();
                        (axis.0, info)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            name: device.name().unwrap_or("Unknown").to_string(),
            identity: DeviceIdentity::new(id.vendor(), id.product()),
            keys,
            axes,
            force_feedback: device.supported_events().contains(EventType::FORCEFEEDBACK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse_and_display() {
        let id: DeviceIdentity = "0079:0006".parse().unwrap();
        assert_eq!(id, DeviceIdentity::new(0x0079, 0x0006));
        assert_eq!(id.to_string(), "0079:0006");
    }

    #[test]
    fn test_identity_parse_accepts_prefix_and_case() {
        let id: DeviceIdentity = "0x054C:0CE6".parse().unwrap();
        assert_eq!(id, DeviceIdentity::new(0x054c, 0x0ce6));
    }

    #[test]
    fn test_identity_parse_rejects_garbage() {
        assert!("0079".parse::<DeviceIdentity>().is_err());
        assert!("zzzz:0006".parse::<DeviceIdentity>().is_err());
        assert!("10000:0006".parse::<DeviceIdentity>().is_err());
    }

    #[test]
    fn test_parse_hex_id() {
        assert_eq!(parse_hex_id("045e"), Some(0x045e));
        assert_eq!(parse_hex_id(" 0x028e "), Some(0x028e));
        assert_eq!(parse_hex_id(""), None);
    }
}
