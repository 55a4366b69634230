//! # Error Types
//!
//! Custom error types for Joystick Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Joystick Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Wire frame errors (bad length, start byte, or checksum)
    #[error("Frame error: {0}")]
    Frame(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Joystick device errors
    #[error("Joystick error: {0}")]
    Joystick(String),

    /// No joystick device found on the system
    #[error("No joystick device found")]
    JoystickNotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joystick Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
