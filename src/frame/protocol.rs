//! # Frame Protocol Constants and Types
//!
//! Layout of the control frame consumed by the downstream microcontroller:
//!
//! | Offset | Field    | Type | Notes                                |
//! |--------|----------|------|--------------------------------------|
//! | 0      | start    | u8   | constant `0xAA`                      |
//! | 1-2    | x        | i16  | roll axis, little-endian             |
//! | 3-4    | y        | i16  | pitch axis, little-endian            |
//! | 5      | btn      | u8   | 0 or 1                               |
//! | 6      | checksum | u8   | sum of bytes 1..=5 mod 256           |
//!
//! The downstream parser is bit-exact, so the byte order and the additive
//! checksum are fixed protocol facts, not implementation choices.

use std::fmt;

/// Frame start byte
pub const START_BYTE: u8 = 0xAA;

/// Total frame length in bytes
pub const FRAME_LEN: usize = 7;

/// Number of payload bytes covered by the checksum (bytes 1..=5)
pub const PAYLOAD_LEN: usize = 5;

/// A complete 7-byte control frame.
///
/// Derived deterministically from a sample by the encoder; never mutated.
///
/// # Examples
///
/// ```
/// use joystick_bridge::frame::encoder::encode_frame_parts;
///
/// let frame = encode_frame_parts(100, -200, 1);
/// assert_eq!(frame.as_bytes().len(), 7);
/// assert_eq!(frame.as_bytes()[0], 0xAA);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Create a frame from raw bytes.
    ///
    /// Callers are expected to hand in a well-formed frame; use the encoder
    /// to build one from a sample.
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw frame bytes.
    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The checksum byte (last byte of the frame).
    pub const fn checksum(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }
}

impl fmt::Display for Frame {
    /// Formats the frame as space-separated uppercase hex, e.g.
    /// `"AA 64 00 38 FF 01 9C"`. This is the human-readable encoding served
    /// by the telemetry endpoint.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Calculate the additive checksum over a payload slice
///
/// # Arguments
///
/// * `payload` - The bytes covered by the checksum (frame bytes 1..=5;
///   the start byte is excluded)
///
/// # Returns
///
/// * `u8` - Sum of all bytes modulo 256
///
/// # Examples
///
/// ```
/// use joystick_bridge::frame::protocol::additive_checksum;
///
/// let payload = [0x64, 0x00, 0x38, 0xFF, 0x01];
/// assert_eq!(additive_checksum(&payload), 0x9C);
/// ```
pub fn additive_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_byte_constant() {
        assert_eq!(START_BYTE, 0xAA, "Start byte is fixed by the downstream parser");
    }

    #[test]
    fn test_frame_length_constant() {
        assert_eq!(FRAME_LEN, 7);
        assert_eq!(PAYLOAD_LEN, 5);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(additive_checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_single_byte() {
        assert_eq!(additive_checksum(&[0x42]), 0x42);
    }

    #[test]
    fn test_checksum_wraps_mod_256() {
        // 0xFF + 0xFF = 0x1FE, mod 256 = 0xFE
        assert_eq!(additive_checksum(&[0xFF, 0xFF]), 0xFE);
        // 0x80 + 0x80 = 0x100, mod 256 = 0x00
        assert_eq!(additive_checksum(&[0x80, 0x80]), 0x00);
    }

    #[test]
    fn test_checksum_worked_example() {
        // From the payload for sample (xi=100, yi=-200, btn=1)
        let payload = [0x64, 0x00, 0x38, 0xFF, 0x01];
        let expected = (0x64u32 + 0x00 + 0x38 + 0xFF + 0x01) % 256;
        assert_eq!(additive_checksum(&payload), expected as u8);
    }

    #[test]
    fn test_frame_display_hex() {
        let frame = Frame::from_bytes([0xAA, 0x64, 0x00, 0x38, 0xFF, 0x01, 0x9C]);
        assert_eq!(frame.to_string(), "AA 64 00 38 FF 01 9C");
    }

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::from_bytes([0xAA, 0, 0, 0, 0, 0, 0x00]);
        assert_eq!(frame.as_bytes()[0], 0xAA);
        assert_eq!(frame.checksum(), 0x00);
    }
}
