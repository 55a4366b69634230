//! # Frame Encoder
//!
//! Encodes quantized samples into complete wire frames, and decodes frames
//! back for verification.

use super::protocol::{additive_checksum, Frame, FRAME_LEN, START_BYTE};
use crate::error::{BridgeError, Result};
use crate::state::Sample;

/// Encode a sample into a complete 7-byte frame
///
/// Pure function with no failure modes; always produces exactly 7 bytes.
/// The checksum covers the 5 payload bytes following the start byte, not
/// the start byte itself.
///
/// # Arguments
///
/// * `sample` - The quantized sample to encode
///
/// # Returns
///
/// * `Frame` - Complete frame (start + x + y + btn + checksum)
///
/// # Examples
///
/// ```
/// use joystick_bridge::frame::encoder::encode_frame;
/// use joystick_bridge::state::Sample;
///
/// let sample = Sample::new(0.5, -0.5, 1);
/// let frame = encode_frame(&sample);
/// assert_eq!(frame.as_bytes()[0], 0xAA);
/// ```
pub fn encode_frame(sample: &Sample) -> Frame {
    encode_frame_parts(sample.xi, sample.yi, sample.btn)
}

/// Encode raw frame fields into a complete 7-byte frame
///
/// # Arguments
///
/// * `xi` - Quantized roll axis
/// * `yi` - Quantized pitch axis
/// * `btn` - Button state (0 or 1)
///
/// # Returns
///
/// * `Frame` - Complete frame with little-endian axis fields and checksum
pub fn encode_frame_parts(xi: i16, yi: i16, btn: u8) -> Frame {
    let x = xi.to_le_bytes();
    let y = yi.to_le_bytes();

    let mut bytes = [0u8; FRAME_LEN];
    bytes[0] = START_BYTE;
    bytes[1] = x[0];
    bytes[2] = x[1];
    bytes[3] = y[0];
    bytes[4] = y[1];
    bytes[5] = btn;
    bytes[6] = additive_checksum(&bytes[1..6]);

    Frame::from_bytes(bytes)
}

/// Decoded frame fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Quantized roll axis
    pub xi: i16,
    /// Quantized pitch axis
    pub yi: i16,
    /// Button state (0 or 1)
    pub btn: u8,
}

/// Decode and validate a wire frame
///
/// # Arguments
///
/// * `bytes` - Candidate frame bytes
///
/// # Returns
///
/// * `Result<DecodedFrame>` - Decoded fields if the frame is well-formed
///
/// # Errors
///
/// Returns `Frame` error if the length is not 7 bytes, the start byte is
/// wrong, or the checksum does not match.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedFrame> {
    if bytes.len() != FRAME_LEN {
        return Err(BridgeError::Frame(format!(
            "expected {} bytes, got {}",
            FRAME_LEN,
            bytes.len()
        )));
    }

    if bytes[0] != START_BYTE {
        return Err(BridgeError::Frame(format!(
            "bad start byte: 0x{:02X}",
            bytes[0]
        )));
    }

    let expected = additive_checksum(&bytes[1..6]);
    if bytes[6] != expected {
        return Err(BridgeError::Frame(format!(
            "checksum mismatch: got 0x{:02X}, expected 0x{:02X}",
            bytes[6], expected
        )));
    }

    Ok(DecodedFrame {
        xi: i16::from_le_bytes([bytes[1], bytes[2]]),
        yi: i16::from_le_bytes([bytes[3], bytes[4]]),
        btn: bytes[5],
    })
}
