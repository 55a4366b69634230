//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! All values are immutable inputs for the process lifetime; nothing in the
//! pipeline re-reads configuration after startup.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::input::InputMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Preferred port; enumerated alternatives are tried when it fails
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Master switch: false skips hardware entirely (simulation mode)
    #[serde(default = "default_serial_enabled")]
    pub enabled: bool,

    /// How long to wait after open before the first write; downstream MCUs
    /// reset on DTR toggle
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Input source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_mode")]
    pub mode: InputMode,

    #[serde(default = "default_deadzone")]
    pub deadzone: f64,

    /// Pitch axis sign convention; aircraft-style sticks want true
    #[serde(default)]
    pub invert_y: bool,

    /// Which joystick button feeds the frame's button byte
    #[serde(default)]
    pub button_index: u8,
}

/// Sampling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    /// Gate transmission on quantized-sample changes
    #[serde(default)]
    pub send_on_change: bool,
}

/// Telemetry endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_serial_enabled() -> bool { true }
fn default_settle_delay_ms() -> u64 { 1500 }

fn default_input_mode() -> InputMode { InputMode::Auto }
fn default_deadzone() -> f64 { 0.05 }

fn default_rate_hz() -> u32 { 100 }

fn default_telemetry_enabled() -> bool { true }
fn default_bind_addr() -> String { "127.0.0.1:8080".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            enabled: default_serial_enabled(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: default_input_mode(),
            deadzone: default_deadzone(),
            invert_y: false,
            button_index: 0,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            send_on_change: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            input: InputConfig::default(),
            sampling: SamplingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
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
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_bridge::config::Config;
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

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.enabled && self.serial.port.is_empty() {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("serial port cannot be empty when serial is enabled")
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0")
            ));
        }

        if self.serial.settle_delay_ms > 10000 {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("settle_delay_ms must be at most 10000")
            ));
        }

        if self.sampling.rate_hz == 0 || self.sampling.rate_hz > 1000 {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("rate_hz must be between 1 and 1000")
            ));
        }

        // NaN fails both range comparisons, so test finiteness explicitly
        if !self.input.deadzone.is_finite()
            || self.input.deadzone < 0.0
            || self.input.deadzone > 0.25
        {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("deadzone must be a finite value between 0.0 and 0.25")
            ));
        }

        if self.telemetry.enabled && self.telemetry.bind_addr.is_empty() {
            return Err(crate::error::BridgeError::Config(
                toml::de::Error::custom("telemetry bind_addr cannot be empty when enabled")
            ));
        }

        Ok(())
    }
}
