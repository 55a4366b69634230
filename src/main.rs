//! # Joystick Bridge
//!
//! Streams joystick input as checksummed 7-byte serial frames to a
//! flight-control microcontroller at a fixed rate, with a browser-driven
//! override channel and a read-only telemetry endpoint for an external
//! visualizer.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load TOML configuration (first CLI argument, `config/default.toml`,
//!      or built-in defaults)
//!    - Start the telemetry endpoint (a bind failure disables it, nothing
//!      else)
//!    - Detect the joystick once; forced joystick mode with no device is
//!      fatal
//!    - Open the serial link, falling back to enumerated ports and finally
//!      to simulation mode
//!
//! 2. **Main Loop**
//!    - Fixed-rate sample/encode/transmit/publish ticks
//!    - Ctrl+C sets the stop flag observed at the top of each tick
//!
//! 3. **Shutdown**
//!    - The scheduler closes the serial port before returning, whatever
//!      state the link is in

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

mod config;
mod error;
mod frame;
mod input;
mod scheduler;
mod serial;
mod state;
mod telemetry;

use config::Config;
use input::InputArbiter;
use scheduler::Scheduler;
use serial::SerialLink;
use state::SharedState;

/// Config file consulted when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Joystick Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let shared_state = SharedState::new();

    // The visualizer is optional: a bind failure logs and the loop runs
    // headless.
    let _telemetry_task = if config.telemetry.enabled {
        telemetry::start(&config.telemetry, Arc::clone(&shared_state)).await
    } else {
        info!("Telemetry endpoint disabled by config");
        None
    };

    // Joystick detection happens exactly once, here. Forced joystick mode
    // with no device must exit non-zero before the loop starts.
    let arbiter = InputArbiter::new(&config.input)?;
    if !arbiter.has_joystick() {
        info!("Running without a joystick (override/neutral input only)");
    }

    let link = SerialLink::open(&config.serial).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let scheduler = Scheduler::new(&config.sampling);
    info!("Press Ctrl+C to exit");
    scheduler.run(arbiter, link, shared_state, shutdown_rx).await;

    Ok(())
}

/// Resolve the configuration: explicit CLI path, the default file if it
/// exists, or built-in defaults.
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Ok(Config::load(path)?)
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
            Ok(Config::load(DEFAULT_CONFIG_PATH)?)
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(Config::default())
        }
    }
}
