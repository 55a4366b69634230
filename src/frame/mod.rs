//! # Wire Frame Module
//!
//! Implementation of the 7-byte control frame sent to the downstream
//! microcontroller.
//!
//! This module handles:
//! - Frame layout constants and the [`Frame`](protocol::Frame) type
//! - Sample encoding (two little-endian i16 axes + button)
//! - Additive checksum calculation and verification
//! - Frame decoding for round-trip verification

pub mod protocol;
pub mod encoder;
