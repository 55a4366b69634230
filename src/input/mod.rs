//! # Input Module
//!
//! This module handles everything between raw human input and a quantized
//! sample:
//! - Signal conditioning (deadzone, clamp, quantization, axis inversion)
//! - Joystick device detection and polling via the Linux evdev interface
//! - Arbitration between joystick, remote override, and neutral defaults

pub mod arbiter;
pub mod conditioner;
pub mod joystick;

pub use arbiter::{InputArbiter, InputMode};
pub use conditioner::AxisConditioner;
