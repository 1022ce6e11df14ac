//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty file yields the defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::{parse_hex_id, DeviceIdentity, DeviceSelector};
use crate::engine::{axis, ControlSnapshot, EngineSettings};
use crate::error::{RemapError, Result};
use crate::profile::Mode;
use crate::vibration::{Motor, RumbleDevice, VibrationManager, MAX_INTENSITY, MIN_DURATION_MS};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub engine: EngineConfig,
    pub profile: ProfileConfig,
    pub vibration: VibrationConfig,
    pub logging: LoggingConfig,
}

/// Device selection. All fields empty means auto-detect.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Preferred event device path
    pub path: Option<PathBuf>,

    /// Hex vendor id, e.g. "0079"
    pub vendor: Option<String>,

    /// Hex product id, e.g. "0006"
    pub product: Option<String>,

    /// Case-insensitive name substring
    pub name: Option<String>,
}

/// Engine configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub mouse_mode: bool,

    #[serde(default = "default_sensitivity")]
    pub stick_sensitivity: u32,

    #[serde(default = "default_sensitivity")]
    pub mouse_sensitivity: u32,

    #[serde(default = "default_grab_attempts")]
    pub grab_attempts: u32,

    #[serde(default = "default_grab_backoff_ms")]
    pub grab_backoff_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Mapping profile location
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_path")]
    pub path: PathBuf,
}

/// Vibration test configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VibrationConfig {
    #[serde(default = "default_vibration_enabled")]
    pub enabled: bool,

    #[serde(default = "default_intensity")]
    pub intensity: u8,

    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,

    #[serde(default)]
    pub motor: Motor,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily rolling log files go here when set
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// Default value functions
fn default_sensitivity() -> u32 { 100 }
fn default_grab_attempts() -> u32 { 10 }
fn default_grab_backoff_ms() -> u64 { 100 }
fn default_poll_interval_ms() -> u64 { 5 }

fn default_profile_path() -> PathBuf { PathBuf::from("config/profile.json") }

fn default_vibration_enabled() -> bool { true }
fn default_intensity() -> u8 { 100 }
fn default_duration_ms() -> u32 { 1000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            mouse_mode: false,
            stick_sensitivity: default_sensitivity(),
            mouse_sensitivity: default_sensitivity(),
            grab_attempts: default_grab_attempts(),
            grab_backoff_ms: default_grab_backoff_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { path: default_profile_path() }
    }
}

impl Default for VibrationConfig {
    fn default() -> Self {
        Self {
            enabled: default_vibration_enabled(),
            intensity: default_intensity(),
            duration_ms: default_duration_ms(),
            motor: Motor::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn invalid(message: impl Into<String>) -> RemapError {
    RemapError::ConfigValue(message.into())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joypad_remap::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(RemapError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        // Validate device identity override
        if self.device.vendor.is_some() != self.device.product.is_some() {
            return Err(invalid("device vendor and product must be set together"));
        }
        self.device_identity()?;

        if matches!(&self.device.name, Some(name) if name.trim().is_empty()) {
            return Err(invalid("device name cannot be empty"));
        }

        // Validate sensitivities
        if !axis::STICK_SENSITIVITY_RANGE.contains(&self.engine.stick_sensitivity) {
            return Err(invalid("stick_sensitivity must be between 10 and 500"));
        }

        if !axis::MOUSE_SENSITIVITY_RANGE.contains(&self.engine.mouse_sensitivity) {
            return Err(invalid("mouse_sensitivity must be between 10 and 600"));
        }

        // Validate timing fields
        if self.engine.grab_attempts == 0 || self.engine.grab_attempts > 100 {
            return Err(invalid("grab_attempts must be between 1 and 100"));
        }

        if self.engine.grab_backoff_ms == 0 || self.engine.grab_backoff_ms > 5000 {
            return Err(invalid("grab_backoff_ms must be between 1 and 5000"));
        }

        if self.engine.poll_interval_ms == 0 || self.engine.poll_interval_ms > 100 {
            return Err(invalid("poll_interval_ms must be between 1 and 100"));
        }

        if self.profile.path.as_os_str().is_empty() {
            return Err(invalid("profile path cannot be empty"));
        }

        // Validate vibration
        if self.vibration.intensity > MAX_INTENSITY {
            return Err(invalid("vibration intensity must be between 0 and 100"));
        }

        if self.vibration.duration_ms < MIN_DURATION_MS {
            return Err(invalid(format!(
                "vibration duration_ms must be at least {}",
                MIN_DURATION_MS
            )));
        }

        // Validate log level
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Identity override from `[device]`, if both ids are set.
    pub fn device_identity(&self) -> Result<Option<DeviceIdentity>> {
        match (&self.device.vendor, &self.device.product) {
            (Some(vendor), Some(product)) => {
                let vendor = parse_hex_id(vendor)
                    .ok_or_else(|| invalid(format!("invalid vendor id '{}'", vendor)))?;
                let product = parse_hex_id(product)
                    .ok_or_else(|| invalid(format!("invalid product id '{}'", product)))?;
                Ok(Some(DeviceIdentity::new(vendor, product)))
            }
            _ => Ok(None),
        }
    }

    pub fn device_selector(&self) -> Result<DeviceSelector> {
        Ok(DeviceSelector {
            path: self.device.path.clone(),
            identity: self.device_identity()?,
            name: self.device.name.clone(),
        })
    }

    #[must_use]
    pub fn control_snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: self.engine.mode,
            mouse_mode: self.engine.mouse_mode,
            stick_sensitivity: self.engine.stick_sensitivity,
            mouse_sensitivity: self.engine.mouse_sensitivity,
        }
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            grab_attempts: self.engine.grab_attempts,
            grab_backoff: Duration::from_millis(self.engine.grab_backoff_ms),
            poll_interval: Duration::from_millis(self.engine.poll_interval_ms),
        }
    }

    /// Copies `[vibration]` onto a manager.
    pub fn apply_vibration<D: RumbleDevice>(&self, manager: &mut VibrationManager<D>) {
        manager.set_enabled(self.vibration.enabled);
        manager.set_intensity(self.vibration.intensity);
        manager.set_duration(self.vibration.duration_ms);
    }
}
