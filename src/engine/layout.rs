//! # Axis Layouts
//!
//! Which physical axis codes drive which stick of the virtual gamepad.
//!
//! Most pads report the second stick as `ABS_RX`/`ABS_RY`. Many cheap USB
//! joysticks report it as `ABS_Z`/`ABS_RZ` instead. Supporting a new device
//! family means adding a row to [`FAMILIES`], not new branches in the engine.

use evdev::AbsoluteAxisType;

use crate::device::{DeviceIdentity, DeviceInfo};

/// Logical stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl AxisRole {
    /// Virtual gamepad axis this role is emitted on.
    #[must_use]
    pub fn output_code(self) -> u16 {
        match self {
            AxisRole::LeftX => AbsoluteAxisType::ABS_X.0,
            AxisRole::LeftY => AbsoluteAxisType::ABS_Y.0,
            AxisRole::RightX => AbsoluteAxisType::ABS_RX.0,
            AxisRole::RightY => AbsoluteAxisType::ABS_RY.0,
        }
    }

    /// Main stick axes are the ones mouse mode takes over.
    #[must_use]
    pub fn is_main_stick(self) -> bool {
        matches!(self, AxisRole::LeftX | AxisRole::LeftY)
    }
}

/// Physical axis code for each stick role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLayout {
    pub name: &'static str,
    pub left_x: u16,
    pub left_y: u16,
    pub right_x: u16,
    pub right_y: u16,
}

impl AxisLayout {
    /// Role of a physical axis code under this layout.
    #[must_use]
    pub fn role_of(&self, code: u16) -> Option<AxisRole> {
        [
            (self.left_x, AxisRole::LeftX),
            (self.left_y, AxisRole::LeftY),
            (self.right_x, AxisRole::RightX),
            (self.right_y, AxisRole::RightY),
        ]
        .into_iter()
        .find(|(axis, _)| *axis == code)
        .map(|(_, role)| role)
    }
}

/// Second stick on `ABS_RX`/`ABS_RY`.
pub const STANDARD: AxisLayout = AxisLayout {
    name: "standard",
    left_x: AbsoluteAxisType::ABS_X.0,
    left_y: AbsoluteAxisType::ABS_Y.0,
    right_x: AbsoluteAxisType::ABS_RX.0,
    right_y: AbsoluteAxisType::ABS_RY.0,
};

/// Second stick on `ABS_Z`/`ABS_RZ`.
pub const Z_RZ_SECONDARY: AxisLayout = AxisLayout {
    name: "z-rz secondary",
    left_x: AbsoluteAxisType::ABS_X.0,
    left_y: AbsoluteAxisType::ABS_Y.0,
    right_x: AbsoluteAxisType::ABS_Z.0,
    right_y: AbsoluteAxisType::ABS_RZ.0,
};

/// Known device families.
pub const FAMILIES: &[(DeviceIdentity, &AxisLayout)] = &[
    // DragonRise generic USB joystick
    (DeviceIdentity { vendor: 0x0079, product: 0x0006 }, &Z_RZ_SECONDARY),
    // Personal Communication Systems twin USB adapter
    (DeviceIdentity { vendor: 0x0810, product: 0x0001 }, &Z_RZ_SECONDARY),
    // Microsoft Xbox 360 pad
    (DeviceIdentity { vendor: 0x045e, product: 0x028e }, &STANDARD),
];

/// Picks the layout for a device: known family first, then capabilities.
#[must_use]
pub fn layout_for(info: &DeviceInfo) -> &'static AxisLayout {
    if let Some((_, layout)) = FAMILIES.iter().find(|(id, _)| *id == info.identity) {
        return layout;
    }

    let has = |axis: AbsoluteAxisType| info.axes.contains_key(&axis.0);
    let standard_secondary = has(AbsoluteAxisType::ABS_RX) || has(AbsoluteAxisType::ABS_RY);
    let z_secondary = has(AbsoluteAxisType::ABS_Z) && has(AbsoluteAxisType::ABS_RZ);

    if !standard_secondary && z_secondary {
        &Z_RZ_SECONDARY
    } else {
        &STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::AxisInfo;
    use std::collections::{BTreeMap, BTreeSet};

    fn info(id: (u16, u16), axes: &[AbsoluteAxisType]) -> DeviceInfo {
        DeviceInfo {
            path: "/dev/input/event4".into(),
            name: "Test Pad".to_string(),
            identity: DeviceIdentity::new(id.0, id.1),
            keys: BTreeSet::new(),
            axes: axes
                .iter()
                .map(|axis| (axis.0, AxisInfo::new(0, 255)))
                .collect::<BTreeMap<_, _>>(),
            force_feedback: false,
        }
    }

    #[test]
    fn test_standard_roles() {
        assert_eq!(STANDARD.role_of(AbsoluteAxisType::ABS_X.0), Some(AxisRole::LeftX));
        assert_eq!(STANDARD.role_of(AbsoluteAxisType::ABS_RY.0), Some(AxisRole::RightY));
        assert_eq!(STANDARD.role_of(AbsoluteAxisType::ABS_Z.0), None);
        assert_eq!(STANDARD.role_of(AbsoluteAxisType::ABS_HAT0X.0), None);
    }

    #[test]
    fn test_secondary_roles_emit_on_rx_ry() {
        let role = Z_RZ_SECONDARY.role_of(AbsoluteAxisType::ABS_RZ.0).unwrap();
        assert_eq!(role, AxisRole::RightY);
        assert_eq!(role.output_code(), AbsoluteAxisType::ABS_RY.0);
    }

    #[test]
    fn test_known_family_wins() {
        // Has RX/RY, but the family table says Z/RZ
        let device = info(
            (0x0079, 0x0006),
            &[AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_RX, AbsoluteAxisType::ABS_RY],
        );
        assert_eq!(layout_for(&device), &Z_RZ_SECONDARY);
    }

    #[test]
    fn test_capability_fallback() {
        let z_only = info(
            (0x1234, 0x5678),
            &[AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y, AbsoluteAxisType::ABS_Z, AbsoluteAxisType::ABS_RZ],
        );
        assert_eq!(layout_for(&z_only), &Z_RZ_SECONDARY);

        // Triggers on Z/RZ alongside a real RX/RY stick
        let full = info(
            (0x1234, 0x5678),
            &[
                AbsoluteAxisType::ABS_X,
                AbsoluteAxisType::ABS_Y,
                AbsoluteAxisType::ABS_Z,
                AbsoluteAxisType::ABS_RX,
                AbsoluteAxisType::ABS_RY,
                AbsoluteAxisType::ABS_RZ,
            ],
        );
        assert_eq!(layout_for(&full), &STANDARD);
    }

    #[test]
    fn test_main_stick_roles() {
        assert!(AxisRole::LeftX.is_main_stick());
        assert!(AxisRole::LeftY.is_main_stick());
        assert!(!AxisRole::RightX.is_main_stick());
    }
}
