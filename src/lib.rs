//! # Joystick Bridge Library
//!
//! Stream joystick input as checksummed serial frames to a flight-control
//! microcontroller.
//!
//! This library provides the core pipeline: signal conditioning, frame
//! encoding, serial link management, input source arbitration, the
//! fixed-rate transmission scheduler, and the telemetry bridge for an
//! external visualizer.

pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod scheduler;
pub mod serial;
pub mod state;
pub mod telemetry;
