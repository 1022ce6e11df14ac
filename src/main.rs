//! # Joypad Remap
//!
//! Remap a generic Linux joystick onto a virtual gamepad.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load `config/default.toml` (or `--config`), apply command-line overrides
//!    - Set up logging with a tracing subscriber (plus a rolling file if configured)
//!
//! 2. **`run`**
//!    - Resolve the device and create the virtual gamepad on an engine thread
//!    - Forward status changes to the log
//!    - Stop on Ctrl+C and wait for cleanup
//!
//! 3. **`list` / `map` / `show` / `rumble`**
//!    - One-shot commands against the scanner, profile store and vibration manager
//!
//! # Examples
//!
//! ```bash
//! joypad-remap list
//! joypad-remap map --button 288 BTN_A
//! joypad-remap map --axis 16 --direction -1 BTN_DPAD_LEFT
//! joypad-remap run --mouse
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use joypad_remap::config::{Config, LoggingConfig};
use joypad_remap::device::{list_supported, DeviceIdentity};
use joypad_remap::engine::{Engine, EngineControl, EngineStatus};
use joypad_remap::profile::{AxisDirection, Mode, ProfileStore};
use joypad_remap::vibration::{Motor, VibrationManager};

/// Default configuration file
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `[logging].directory`
const LOG_FILE_PREFIX: &str = "joypad-remap.log";

#[derive(Debug, Parser)]
#[command(name = "joypad-remap", version, about = "Remap generic joysticks onto a virtual gamepad")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Mapping profile file (overrides [profile].path)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Preferred event device path
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Device identity override
    #[arg(long, global = true, value_name = "VVVV:PPPP")]
    id: Option<DeviceIdentity>,

    /// Device name substring override
    #[arg(long, global = true)]
    device_name: Option<String>,

    /// Log level (overrides [logging].level; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Grab the device and remap until Ctrl+C (default)
    Run {
        /// Mapping mode
        #[arg(long)]
        mode: Option<Mode>,

        /// Drive the cursor with the left stick
        #[arg(long)]
        mouse: bool,

        /// Stick sensitivity, percent
        #[arg(long)]
        stick_sensitivity: Option<u32>,

        /// Mouse sensitivity, percent
        #[arg(long)]
        mouse_sensitivity: Option<u32>,
    },

    /// List gamepad-like devices, best match first
    List,

    /// Bind a physical button or axis to a virtual name
    Map {
        #[arg(long, default_value_t = Mode::Analog)]
        mode: Mode,

        /// Physical key code
        #[arg(long, value_name = "CODE", conflicts_with = "axis", required_unless_present = "axis")]
        button: Option<u16>,

        /// Physical axis code
        #[arg(long, value_name = "CODE")]
        axis: Option<u16>,

        /// Bind only one direction of the axis (-1 or 1)
        #[arg(long, requires = "axis", allow_hyphen_values = true)]
        direction: Option<AxisDirection>,

        /// Virtual name, e.g. BTN_A, BTN_DPAD_UP, MOUSE_LEFT
        name: String,
    },

    /// Print the mapping profile
    Show,

    /// Play one vibration test
    Rumble {
        #[arg(long)]
        motor: Option<Motor>,

        /// Intensity, percent
        #[arg(long)]
        intensity: Option<u8>,

        /// Duration in milliseconds
        #[arg(long)]
        duration: Option<u32>,
    },
}

impl Cli {
    /// Loads the config file and folds the global flags into it.
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;

        if let Some(path) = &self.profile {
            config.profile.path = path.clone();
        }
        if let Some(path) = &self.device {
            config.device.path = Some(path.clone());
        }
        if let Some(id) = self.id {
            config.device.vendor = Some(format!("{:04x}", id.vendor));
            config.device.product = Some(format!("{:04x}", id.product));
        }
        if let Some(name) = &self.device_name {
            config.device.name = Some(name.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Installs the subscriber; the guard must live as long as the process.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log filter")?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load_config()?;
    let _log_guard = init_logging(&config.logging)?;

    info!("Joypad Remap v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => run(config).await,
        Some(Commands::Run {
            mode,
            mouse,
            stick_sensitivity,
            mouse_sensitivity,
        }) => {
            if let Some(mode) = mode {
                config.engine.mode = mode;
            }
            config.engine.mouse_mode |= mouse;
            if let Some(percent) = stick_sensitivity {
                config.engine.stick_sensitivity = percent;
            }
            if let Some(percent) = mouse_sensitivity {
                config.engine.mouse_sensitivity = percent;
            }
            config.validate()?;
            run(config).await
        }
        Some(Commands::List) => list(&config),
        Some(Commands::Map {
            mode,
            button,
            axis,
            direction,
            name,
        }) => map(&config, mode, button, axis, direction, &name),
        Some(Commands::Show) => show(&config),
        Some(Commands::Rumble {
            motor,
            intensity,
            duration,
        }) => rumble(&config, motor, intensity, duration),
    }
}

/// Runs the engine on its own thread until Ctrl+C or failure.
async fn run(config: Config) -> Result<()> {
    let selector = config.device_selector()?;
    let profile = Arc::new(ProfileStore::open(&config.profile.path)?);
    let control = EngineControl::new(config.control_snapshot());
    let settings = config.engine_settings();

    let (status_tx, mut status_rx) = watch::channel(EngineStatus::Idle);
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            info!("Status: {}", *status_rx.borrow_and_update());
        }
    });

    let engine_control = control.clone();
    let engine_thread = std::thread::Builder::new()
        .name("engine".to_string())
        .spawn(move || {
            let mut engine = Engine::open(&selector, profile, engine_control, settings, status_tx)?;
            engine.run()
        })
        .context("Failed to spawn engine thread")?;

    info!("Press Ctrl+C to exit");
    let mut join = tokio::task::spawn_blocking(move || engine_thread.join());

    let joined = tokio::select! {
        joined = &mut join => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            control.stop();
            join.await
        }
    };

    let outcome = joined
        .context("Engine join task failed")?
        .map_err(|_| anyhow!("Engine thread panicked"))?;

    if let Err(e) = status_task.await {
        warn!("Status task ended abnormally: {}", e);
    }
    outcome?;
    Ok(())
}

fn list(config: &Config) -> Result<()> {
    let devices = list_supported(config.device_identity()?);
    if devices.is_empty() {
        println!("No supported devices found");
        return Ok(());
    }

    for device in devices {
        println!(
            "{:<20} {}  score {:>3}{}  {}",
            device.info.path.display(),
            device.info.identity,
            device.score,
            if device.info.force_feedback { "  rumble" } else { "" },
            device.info.name
        );
    }
    Ok(())
}

fn map(
    config: &Config,
    mode: Mode,
    button: Option<u16>,
    axis: Option<u16>,
    direction: Option<AxisDirection>,
    name: &str,
) -> Result<()> {
    let store = ProfileStore::open(&config.profile.path)?;
    match (button, axis) {
        (Some(code), _) => store.set_button_mapping(mode, code, name)?,
        (None, Some(code)) => store.set_axis_mapping(mode, code, direction, name)?,
        (None, None) => return Err(anyhow!("Either --button or --axis is required")),
    }
    println!("Saved to {}", store.path().display());
    Ok(())
}

fn show(config: &Config) -> Result<()> {
    let store = ProfileStore::open(&config.profile.path)?;
    let profile = store.snapshot();
    println!("# {}", store.path().display());

    for mode in Mode::ALL {
        let bindings = profile.mode(mode);
        println!("[{}]", mode);
        if bindings.is_empty() {
            println!("  (no mappings)");
            continue;
        }
        for (code, name) in &bindings.buttons {
            println!("  button {:<8} -> {}", code, name);
        }
        for (code, name) in &bindings.axes {
            println!("  axis   {:<8} -> {}", code, name);
        }
    }
    Ok(())
}

fn rumble(config: &Config, motor: Option<Motor>, intensity: Option<u8>, duration: Option<u32>) -> Result<()> {
    let mut vibration = VibrationManager::locate(&config.device_selector()?);
    config.apply_vibration(&mut vibration);
    if let Some(percent) = intensity {
        vibration.set_intensity(percent);
    }
    if let Some(ms) = duration {
        vibration.set_duration(ms);
    }

    if !vibration.has_device() {
        println!("No vibration device found");
        return Ok(());
    }

    if vibration.is_device_grabbed_elsewhere() {
        warn!("Vibration device is grabbed by another process, the effect will not play");
        println!("Device is grabbed by another process (is `run` active?); rumble will be silent");
        return Ok(());
    }

    let motor = motor.unwrap_or(config.vibration.motor);
    vibration.test(motor)?;
    println!(
        "Rumble: {} motor, {}%, {} ms",
        motor,
        vibration.intensity(),
        vibration.duration_ms()
    );
    // Keep the effect uploaded until it has finished playing
    std::thread::sleep(std::time::Duration::from_millis(u64::from(vibration.duration_ms())));
    Ok(())
}
