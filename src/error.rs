//! # Error Types
//!
//! Custom error types for Joypad Remap using `thiserror`.

use thiserror::Error;

/// Main error type for Joypad Remap
#[derive(Debug, Error)]
pub enum RemapError {
    /// No input device matched the selector (or none looked like a gamepad)
    #[error("No compatible device found ({0})")]
    DeviceNotFound(String),

    /// Exclusive access could not be acquired within the retry budget
    #[error("Failed to grab {path} after {attempts} attempts: {source}")]
    Grab {
        path: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// uinput device creation failed
    #[error("Virtual device error: {0}")]
    VirtualDevice(String),

    /// Force-feedback upload or playback failed
    #[error("Force feedback error: {0}")]
    ForceFeedback(#[source] std::io::Error),

    /// Mapping profile (de)serialization errors
    #[error("Profile error: {0}")]
    Profile(#[from] serde_json::Error),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    ConfigValue(String),

    /// Unknown mapping mode name
    #[error("Unknown mode '{0}' (expected 'analog' or 'digital')")]
    UnknownMode(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joypad Remap
pub type Result<T> = std::result::Result<T, RemapError>;
