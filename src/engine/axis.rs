//! # Axis Processing
//!
//! Normalization, deadzone, sensitivity and mouse-delta math for stick axes.
//!
//! ## Pipeline
//!
//! ```text
//! raw ──normalize──> [-32768, 32767] ──deadzone──> ──sensitivity──> output
//!                                                        └──mouse_delta──> REL_X / REL_Y
//! ```
//!
//! ## Normalization
//!
//! The device-reported `{min, max}` define the center (midpoint) and span
//! (largest distance from center to either bound). Devices that report no
//! usable range fall back to the classic 0..255 joystick transform.
//!
//! ## Usage
//!
//! ```
//! use joypad_remap::device::AxisInfo;
//! use joypad_remap::engine::axis::{apply_deadzone, apply_sensitivity, normalize};
//!
//! let info = AxisInfo::new(0, 255);
//! let value = normalize(255, Some(&info));
//! assert_eq!(value, 32767);
//!
//! // Small drift is dropped
//! assert_eq!(apply_deadzone(normalize(128, Some(&info))), 0);
//!
//! // 200% doubles, clamped to the output range
//! assert_eq!(apply_sensitivity(20000, 200), 32767);
//! ```

use std::ops::RangeInclusive;

use crate::device::AxisInfo;

/// Lowest normalized axis value.
pub const OUTPUT_MIN: i32 = -32768;
/// Highest normalized axis value.
pub const OUTPUT_MAX: i32 = 32767;

/// Normalized magnitudes below this collapse to 0.
pub const DEADZONE: i32 = 4000;

/// Center of the fallback 0..255 transform.
pub const FALLBACK_CENTER: i32 = 128;
/// Scale of the fallback 0..255 transform.
pub const FALLBACK_SCALE: i32 = 256;

/// Allowed stick sensitivity, percent.
pub const STICK_SENSITIVITY_RANGE: RangeInclusive<u32> = 10..=500;
/// Allowed mouse sensitivity, percent.
pub const MOUSE_SENSITIVITY_RANGE: RangeInclusive<u32> = 10..=600;

/// Normalized magnitudes below this do not move the cursor.
pub const MOUSE_THRESHOLD: i32 = 2000;
/// Cursor pixels per event at full deflection and 100% sensitivity.
pub const MOUSE_SPEED: f64 = 20.0;
/// Largest cursor step per event.
pub const MOUSE_MAX_DELTA: i32 = 60;

/// Clamps to the normalized output range.
#[inline]
#[must_use]
pub fn clamp_output(value: i64) -> i32 {
    value.clamp(i64::from(OUTPUT_MIN), i64::from(OUTPUT_MAX)) as i32
}

/// Maps a raw axis value into `[-32768, 32767]`.
///
/// # Arguments
///
/// * `raw` - Value as reported by the device
/// * `info` - Device axis metadata, if known
///
/// # Returns
///
/// The device minimum maps to -32767 (within one unit of the floor), the
/// maximum to 32767 and the midpoint to 0.
#[must_use]
pub fn normalize(raw: i32, info: Option<&AxisInfo>) -> i32 {
    match info.filter(|info| info.maximum > info.minimum) {
        Some(info) => {
            let min = f64::from(info.minimum);
            let max = f64::from(info.maximum);
            let center = (min + max) / 2.0;
            let span = (max - center).max(center - min);
            let scaled = (f64::from(raw) - center) / span * f64::from(OUTPUT_MAX);
            clamp_output(scaled.round() as i64)
        }
        None => normalize_fallback(raw),
    }
}

/// Fixed 0..255 transform used when the device reports no usable range.
#[must_use]
pub fn normalize_fallback(raw: i32) -> i32 {
    clamp_output((i64::from(raw) - i64::from(FALLBACK_CENTER)) * i64::from(FALLBACK_SCALE))
}

/// Drops values whose magnitude is below [`DEADZONE`]; others pass unchanged.
#[inline]
#[must_use]
pub fn apply_deadzone(value: i32) -> i32 {
    if value.abs() < DEADZONE {
        0
    } else {
        value
    }
}

/// Scales by `percent` (clamped to [`STICK_SENSITIVITY_RANGE`]) and re-clamps.
#[must_use]
pub fn apply_sensitivity(value: i32, percent: u32) -> i32 {
    let percent = clamp_stick_sensitivity(percent);
    clamp_output(i64::from(value) * i64::from(percent) / 100)
}

#[must_use]
pub fn clamp_stick_sensitivity(percent: u32) -> u32 {
    percent.clamp(*STICK_SENSITIVITY_RANGE.start(), *STICK_SENSITIVITY_RANGE.end())
}

#[must_use]
pub fn clamp_mouse_sensitivity(percent: u32) -> u32 {
    percent.clamp(*MOUSE_SENSITIVITY_RANGE.start(), *MOUSE_SENSITIVITY_RANGE.end())
}

/// Converts a normalized stick value into a bounded cursor step.
///
/// Returns 0 below [`MOUSE_THRESHOLD`]; otherwise a step proportional to the
/// deflection and `mouse_sensitivity`, capped at [`MOUSE_MAX_DELTA`].
#[must_use]
pub fn mouse_delta(value: i32, mouse_sensitivity: u32) -> i32 {
    if value.abs() < MOUSE_THRESHOLD {
        return 0;
    }
    let sensitivity = f64::from(clamp_mouse_sensitivity(mouse_sensitivity)) / 100.0;
    let delta = f64::from(value) / f64::from(OUTPUT_MAX) * MOUSE_SPEED * sensitivity;
    (delta.round() as i32).clamp(-MOUSE_MAX_DELTA, MOUSE_MAX_DELTA)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_endpoints_8bit() {
        let info = AxisInfo::new(0, 255);
        assert!((normalize(0, Some(&info)) - OUTPUT_MIN).abs() <= 1);
        assert_eq!(normalize(255, Some(&info)), OUTPUT_MAX);
    }

    #[test]
    fn test_normalize_endpoints_signed_16bit() {
        let info = AxisInfo::new(-32768, 32767);
        assert!((normalize(-32768, Some(&info)) - OUTPUT_MIN).abs() <= 1);
        assert!((normalize(32767, Some(&info)) - OUTPUT_MAX).abs() <= 1);
        assert_eq!(normalize(0, Some(&info)), 0);
    }

    #[test]
    fn test_normalize_endpoints_10bit() {
        let info = AxisInfo::new(0, 1023);
        assert!((normalize(0, Some(&info)) - OUTPUT_MIN).abs() <= 1);
        assert_eq!(normalize(1023, Some(&info)), OUTPUT_MAX);
    }

    #[test]
    fn test_normalize_center_is_near_zero() {
        let info = AxisInfo::new(0, 255);
        // 127.5 is the true center; both neighbours are well inside the deadzone
        assert!(normalize(127, Some(&info)).abs() < DEADZONE);
        assert!(normalize(128, Some(&info)).abs() < DEADZONE);
    }

    #[test]
    fn test_normalize_out_of_range_is_clamped() {
        let info = AxisInfo::new(0, 255);
        assert_eq!(normalize(400, Some(&info)), OUTPUT_MAX);
        assert_eq!(normalize(-400, Some(&info)), OUTPUT_MIN);
    }

    #[test]
    fn test_normalize_falls_back_without_metadata() {
        assert_eq!(normalize(128, None), 0);
        assert_eq!(normalize(0, None), OUTPUT_MIN);
        assert_eq!(normalize(255, None), 127 * 256);
    }

    #[test]
    fn test_normalize_falls_back_on_degenerate_range() {
        let flat = AxisInfo::new(0, 0);
        assert_eq!(normalize(200, Some(&flat)), normalize_fallback(200));

        let inverted = AxisInfo::new(255, 0);
        assert_eq!(normalize(0, Some(&inverted)), normalize_fallback(0));
    }

    // ==================== Deadzone Tests ====================

    #[test]
    fn test_deadzone_boundary() {
        assert_eq!(apply_deadzone(DEADZONE - 1), 0);
        assert_eq!(apply_deadzone(DEADZONE), DEADZONE);
        assert_eq!(apply_deadzone(-(DEADZONE - 1)), 0);
        assert_eq!(apply_deadzone(-DEADZONE), -DEADZONE);
    }

    #[test]
    fn test_deadzone_passes_large_values_unchanged() {
        assert_eq!(apply_deadzone(OUTPUT_MAX), OUTPUT_MAX);
        assert_eq!(apply_deadzone(OUTPUT_MIN), OUTPUT_MIN);
        assert_eq!(apply_deadzone(12345), 12345);
    }

    // ==================== Sensitivity Tests ====================

    #[test]
    fn test_sensitivity_identity_at_100() {
        assert_eq!(apply_sensitivity(12000, 100), 12000);
        assert_eq!(apply_sensitivity(-12000, 100), -12000);
    }

    #[test]
    fn test_sensitivity_scales_and_clamps() {
        assert_eq!(apply_sensitivity(10000, 50), 5000);
        assert_eq!(apply_sensitivity(30000, 200), OUTPUT_MAX);
        assert_eq!(apply_sensitivity(-30000, 200), OUTPUT_MIN);
    }

    #[test]
    fn test_sensitivity_percent_is_clamped() {
        // 1% is raised to 10%, 1000% lowered to 500%
        assert_eq!(apply_sensitivity(10000, 1), 1000);
        assert_eq!(apply_sensitivity(1000, 1000), 5000);
        assert_eq!(clamp_stick_sensitivity(0), 10);
        assert_eq!(clamp_mouse_sensitivity(900), 600);
    }

    // ==================== Mouse Delta Tests ====================

    #[test]
    fn test_mouse_delta_below_threshold() {
        assert_eq!(mouse_delta(MOUSE_THRESHOLD - 1, 100), 0);
        assert_eq!(mouse_delta(-(MOUSE_THRESHOLD - 1), 600), 0);
    }

    #[test]
    fn test_mouse_delta_full_deflection() {
        assert_eq!(mouse_delta(OUTPUT_MAX, 100), 20);
        assert_eq!(mouse_delta(OUTPUT_MIN, 100), -20);
    }

    #[test]
    fn test_mouse_delta_is_capped() {
        assert_eq!(mouse_delta(OUTPUT_MAX, 600), MOUSE_MAX_DELTA);
        assert_eq!(mouse_delta(OUTPUT_MIN, 600), -MOUSE_MAX_DELTA);
    }

    #[test]
    fn test_mouse_delta_grows_with_deflection() {
        let half = mouse_delta(16384, 100);
        let full = mouse_delta(OUTPUT_MAX, 100);
        assert!(half > 0 && half < full);
    }
}
