//! # Device Scanner
//!
//! Scores input devices by gamepad-likeness and resolves the one to remap.
//!
//! ## Scoring
//!
//! A device earns one point per supported key code that is a standard
//! gamepad button or lies in the generic joystick/gamepad button block
//! (`BTN_TRIGGER`..`BTN_THUMBR`), plus one point per standard gamepad axis.
//! A device with no matching buttons or no matching axes scores 0 and is
//! never picked automatically.
//!
//! ## Selection Order
//!
//! 1. Preferred path, if that device scores above 0
//! 2. Explicit vendor/product identity (no score requirement)
//! 3. Name substring (no score requirement)
//! 4. Highest nonzero score; ties go to the first enumerated device

use evdev::{AbsoluteAxisType, Device, Key};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{DeviceIdentity, DeviceInfo, PhysicalDevice};

/// Generic joystick (0x120..) and gamepad (0x130..) button block.
const JOYSTICK_BUTTON_RANGE: RangeInclusive<u16> = 0x120..=0x13f;

/// Standard gamepad buttons outside of the block above.
fn reference_buttons() -> [u16; 19] {
    [
        Key::BTN_SOUTH.code(),
        Key::BTN_EAST.code(),
        Key::BTN_C.code(),
        Key::BTN_NORTH.code(),
        Key::BTN_WEST.code(),
        Key::BTN_Z.code(),
        Key::BTN_TL.code(),
        Key::BTN_TR.code(),
        Key::BTN_TL2.code(),
        Key::BTN_TR2.code(),
        Key::BTN_SELECT.code(),
        Key::BTN_START.code(),
        Key::BTN_MODE.code(),
        Key::BTN_THUMBL.code(),
        Key::BTN_THUMBR.code(),
        Key::BTN_DPAD_UP.code(),
        Key::BTN_DPAD_DOWN.code(),
        Key::BTN_DPAD_LEFT.code(),
        Key::BTN_DPAD_RIGHT.code(),
    ]
}

/// Standard gamepad axes.
const REFERENCE_AXES: [AbsoluteAxisType; 8] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_Z,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
    AbsoluteAxisType::ABS_RZ,
    AbsoluteAxisType::ABS_HAT0X,
    AbsoluteAxisType::ABS_HAT0Y,
];

/// How to pick the device to remap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Preferred `/dev/input/eventX` path
    pub path: Option<PathBuf>,
    /// Exact vendor/product identity (manual override)
    pub identity: Option<DeviceIdentity>,
    /// Case-insensitive substring of the device name (manual override)
    pub name: Option<String>,
}

impl DeviceSelector {
    /// Auto mode: best-scoring device.
    #[must_use]
    pub fn auto() -> Self {
        Self::default()
    }

    /// Short description for status and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(path) = &self.path {
            parts.push(format!("path {}", path.display()));
        }
        if let Some(identity) = &self.identity {
            parts.push(format!("id {}", identity));
        }
        if let Some(name) = &self.name {
            parts.push(format!("name '{}'", name));
        }
        if parts.is_empty() {
            "auto".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// A device together with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredDevice {
    pub info: DeviceInfo,
    pub score: u32,
}

/// Computes how gamepad-like a device is. 0 means "not a gamepad".
///
/// # Examples
///
/// ```
/// use joypad_remap::device::{score, AxisInfo, DeviceIdentity, DeviceInfo};
/// use std::collections::{BTreeMap, BTreeSet};
///
/// let info = DeviceInfo {
///     path: "/dev/input/event5".into(),
///     name: "Generic Joystick".into(),
///     identity: DeviceIdentity::new(0x0079, 0x0006),
///     keys: BTreeSet::from([0x120, 0x121]),
///     axes: BTreeMap::from([(0x00, AxisInfo::new(0, 255)), (0x01, AxisInfo::new(0, 255))]),
///     force_feedback: false,
/// };
/// assert_eq!(score(&info), 4);
/// ```
#[must_use]
pub fn score(info: &DeviceInfo) -> u32 {
    let reference = reference_buttons();
    let buttons = info
        .keys
        .iter()
        .filter(|&&code| JOYSTICK_BUTTON_RANGE.contains(&code) || reference.contains(&code))
        .count();
    let axes = info
        .axes
        .keys()
        .filter(|&&code| REFERENCE_AXES.iter().any(|axis| axis.0 == code))
        .count();

    if buttons == 0 || axes == 0 {
        return 0;
    }
    (buttons + axes) as u32
}

/// Picks the index of the device `selector` resolves to among `devices`.
///
/// `devices` must be in enumeration order; it breaks score ties.
#[must_use]
pub fn select(devices: &[DeviceInfo], selector: &DeviceSelector) -> Option<usize> {
    if let Some(path) = &selector.path {
        if let Some(index) = devices.iter().position(|d| &d.path == path) {
            if score(&devices[index]) > 0 {
                return Some(index);
            }
            debug!("Preferred device {} does not look like a gamepad", path.display());
        }
    }

    if let Some(identity) = selector.identity {
        return devices.iter().position(|d| d.identity == identity);
    }

    if let Some(name) = &selector.name {
        let needle = name.to_lowercase();
        return devices
            .iter()
            .position(|d| d.name.to_lowercase().contains(&needle));
    }

    let mut best: Option<(usize, u32)> = None;
    for (index, device) in devices.iter().enumerate() {
        let device_score = score(device);
        if device_score > best.map_or(0, |(_, s)| s) {
            best = Some((index, device_score));
        }
    }
    best.map(|(index, _)| index)
}

/// Scores `devices`, drops non-gamepads, and sorts by descending score.
///
/// The sort is stable so equal scores keep enumeration order.
#[must_use]
pub fn rank(devices: Vec<DeviceInfo>, identity: Option<DeviceIdentity>) -> Vec<ScoredDevice> {
    let mut ranked: Vec<ScoredDevice> = devices
        .into_iter()
        .filter(|info| identity.map_or(true, |id| info.identity == id))
        .map(|info| ScoredDevice {
            score: score(&info),
            info,
        })
        .filter(|scored| scored.score > 0)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Opens every `/dev/input/event*` device, sorted by path.
///
/// Devices that cannot be opened (usually permissions) are skipped by evdev.
pub(crate) fn enumerate() -> Vec<(DeviceInfo, Device)> {
    let mut devices: Vec<(DeviceInfo, Device)> = evdev::enumerate()
        .map(|(path, device)| {
            let info = DeviceInfo::from_device(&path, &device);
            debug!(
                "Found input device: {} '{}' ({}, score {})",
                path.display(),
                info.name,
                info.identity,
                score(&info)
            );
            (info, device)
        })
        .collect();

    // Sort entries for deterministic device selection when multiple controllers are connected
    devices.sort_by(|a, b| a.0.path.cmp(&b.0.path));
    devices
}

/// Resolves and opens the device described by `selector`.
///
/// Returns `None` when nothing matches; the caller reports "not found".
/// The device is opened for inspection only, not grabbed.
pub fn find(selector: &DeviceSelector) -> Option<PhysicalDevice> {
    let mut selector = selector.clone();
    // Accept by-id / by-path symlinks for the preferred path
    if let Some(path) = selector.path.take() {
        selector.path = Some(std::fs::canonicalize(&path).unwrap_or(path));
    }

    let mut devices = enumerate();
    let infos: Vec<DeviceInfo> = devices.iter().map(|(info, _)| info.clone()).collect();
    let index = select(&infos, &selector)?;

    let (info, device) = devices.swap_remove(index);
    info!(
        "Selected device {} '{}' ({}) via {}",
        info.path.display(),
        info.name,
        info.identity,
        selector.describe()
    );
    Some(PhysicalDevice::new(info, device))
}

/// Lists gamepad-like devices, best first, optionally filtered by identity.
#[must_use]
pub fn list_supported(identity: Option<DeviceIdentity>) -> Vec<ScoredDevice> {
    let infos = enumerate().into_iter().map(|(info, _)| info).collect();
    rank(infos, identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::AxisInfo;
    use std::collections::{BTreeMap, BTreeSet};

    fn device(path: &str, id: (u16, u16), keys: &[u16], axes: &[u16]) -> DeviceInfo {
        DeviceInfo {
            path: PathBuf::from(path),
            name: format!("Device {}", path),
            identity: DeviceIdentity::new(id.0, id.1),
            keys: keys.iter().copied().collect::<BTreeSet<_>>(),
            axes: axes
                .iter()
                .map(|&code| (code, AxisInfo::new(0, 255)))
                .collect::<BTreeMap<_, _>>(),
            force_feedback: false,
        }
    }

    fn keyboard() -> DeviceInfo {
        // KEY_A, KEY_B, KEY_ENTER; no axes
        device("/dev/input/event0", (0x046d, 0xc31c), &[30, 48, 28], &[])
    }

    fn joystick() -> DeviceInfo {
        // BTN_TRIGGER..BTN_BASE4 style buttons, X/Y/Z/RZ + hat
        device(
            "/dev/input/event3",
            (0x0079, 0x0006),
            &[0x120, 0x121, 0x122, 0x123],
            &[0x00, 0x01, 0x02, 0x05, 0x10, 0x11],
        )
    }

    fn xbox_pad() -> DeviceInfo {
        device(
            "/dev/input/event7",
            (0x045e, 0x028e),
            &[0x130, 0x131, 0x133, 0x134, 0x136, 0x137, 0x13a, 0x13b, 0x13c, 0x13d, 0x13e],
            &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x10, 0x11],
        )
    }

    #[test]
    fn test_score_counts_buttons_and_axes() {
        assert_eq!(score(&joystick()), 4 + 6);
        assert_eq!(score(&xbox_pad()), 11 + 8);
    }

    #[test]
    fn test_score_zero_without_axes() {
        assert_eq!(score(&keyboard()), 0);
        let buttons_only = device("/dev/input/event1", (1, 1), &[0x130, 0x131], &[]);
        assert_eq!(score(&buttons_only), 0);
    }

    #[test]
    fn test_score_zero_without_buttons() {
        // Accelerometer-style node: axes but no buttons
        let motion = device("/dev/input/event9", (1, 1), &[], &[0x00, 0x01, 0x02]);
        assert_eq!(score(&motion), 0);
    }

    #[test]
    fn test_score_ignores_unrelated_codes() {
        // Keyboard keys and ABS_MISC do not count
        let odd = device("/dev/input/event2", (1, 1), &[30, 0x130], &[0x28, 0x00]);
        assert_eq!(score(&odd), 2);
    }

    #[test]
    fn test_score_is_monotonic() {
        let mut info = joystick();
        let base = score(&info);

        info.keys.insert(Key::BTN_DPAD_UP.code());
        let with_button = score(&info);
        assert!(with_button >= base);

        info.axes.insert(AbsoluteAxisType::ABS_RX.0, AxisInfo::new(0, 255));
        assert!(score(&info) >= with_button);

        // Unrelated additions never lower it either
        info.keys.insert(30);
        info.axes.insert(0x28, AxisInfo::default());
        assert!(score(&info) >= with_button);
    }

    #[test]
    fn test_select_auto_picks_highest_score() {
        let devices = vec![keyboard(), joystick(), xbox_pad()];
        assert_eq!(select(&devices, &DeviceSelector::auto()), Some(2));
    }

    #[test]
    fn test_select_auto_tie_goes_to_first() {
        let mut twin = joystick();
        twin.path = PathBuf::from("/dev/input/event8");
        let devices = vec![keyboard(), joystick(), twin];
        assert_eq!(select(&devices, &DeviceSelector::auto()), Some(1));
    }

    #[test]
    fn test_select_auto_none_when_all_zero() {
        let devices = vec![keyboard()];
        assert_eq!(select(&devices, &DeviceSelector::auto()), None);
    }

    #[test]
    fn test_select_identity_ignores_score() {
        let devices = vec![keyboard(), xbox_pad()];
        let selector = DeviceSelector {
            identity: Some(DeviceIdentity::new(0x046d, 0xc31c)),
            ..DeviceSelector::default()
        };
        // Keyboard scores 0 and the pad scores higher, identity still wins
        assert_eq!(select(&devices, &selector), Some(0));
    }

    #[test]
    fn test_select_identity_absent_returns_none() {
        let devices = vec![keyboard(), joystick(), xbox_pad()];
        let selector = DeviceSelector {
            identity: Some(DeviceIdentity::new(0xdead, 0xbeef)),
            ..DeviceSelector::default()
        };
        assert_eq!(select(&devices, &selector), None);
    }

    #[test]
    fn test_select_preferred_path() {
        let devices = vec![keyboard(), joystick(), xbox_pad()];
        let selector = DeviceSelector {
            path: Some(PathBuf::from("/dev/input/event3")),
            ..DeviceSelector::default()
        };
        assert_eq!(select(&devices, &selector), Some(1));
    }

    #[test]
    fn test_select_preferred_path_with_zero_score_falls_through() {
        let devices = vec![keyboard(), joystick(), xbox_pad()];
        let selector = DeviceSelector {
            path: Some(PathBuf::from("/dev/input/event0")),
            ..DeviceSelector::default()
        };
        assert_eq!(select(&devices, &selector), Some(2));

        let with_identity = DeviceSelector {
            path: Some(PathBuf::from("/dev/input/event0")),
            identity: Some(DeviceIdentity::new(0x0079, 0x0006)),
            name: None,
        };
        assert_eq!(select(&devices, &with_identity), Some(1));
    }

    #[test]
    fn test_select_by_name_is_case_insensitive() {
        let mut pad = joystick();
        pad.name = "DragonRise Inc. Generic USB Joystick".to_string();
        let devices = vec![keyboard(), pad, xbox_pad()];
        let selector = DeviceSelector {
            name: Some("joystick".to_string()),
            ..DeviceSelector::default()
        };
        assert_eq!(select(&devices, &selector), Some(1));
    }

    #[test]
    fn test_rank_sorts_descending_and_filters() {
        let ranked = rank(vec![keyboard(), joystick(), xbox_pad()], None);
        let paths: Vec<_> = ranked.iter().map(|d| d.info.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/dev/input/event7"), PathBuf::from("/dev/input/event3")]
        );
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut twin = joystick();
        twin.path = PathBuf::from("/dev/input/event1");
        let ranked = rank(vec![joystick(), twin], None);
        assert_eq!(ranked[0].info.path, PathBuf::from("/dev/input/event3"));
        assert_eq!(ranked[1].info.path, PathBuf::from("/dev/input/event1"));
    }

    #[test]
    fn test_rank_identity_filter() {
        let ranked = rank(
            vec![keyboard(), joystick(), xbox_pad()],
            Some(DeviceIdentity::new(0x0079, 0x0006)),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].info.identity, DeviceIdentity::new(0x0079, 0x0006));
    }

    #[test]
    fn test_selector_describe() {
        assert_eq!(DeviceSelector::auto().describe(), "auto");
        let selector = DeviceSelector {
            identity: Some(DeviceIdentity::new(0x0079, 0x0006)),
            ..DeviceSelector::default()
        };
        assert_eq!(selector.describe(), "id 0079:0006");
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_list_supported_with_real_hardware() {
        let devices = list_supported(None);
        assert!(!devices.is_empty(), "Should detect at least one gamepad");
        assert!(devices.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
