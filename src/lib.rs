//! # Joypad Remap Library
//!
//! Remap generic Linux joysticks onto a standard virtual gamepad.
//!
//! This library provides the core functionality for grabbing a physical
//! input device, translating its events through a two-mode mapping profile
//! and re-emitting them on a uinput gamepad (or mouse), plus rumble tests on
//! force-feedback capable devices.

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod output;
pub mod profile;
pub mod vibration;
