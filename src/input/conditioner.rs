//! # Signal Conditioner
//!
//! Deadzone, clamp and quantization transforms applied to raw axis readings
//! before they reach the wire.
//!
//! The quantizer truncates toward zero rather than rounding to nearest. This
//! matches the downstream parser bit-for-bit and is a protocol fact, not an
//! incidental choice.

/// Quantization scale: full deflection maps to +/-32767.
pub const AXIS_SCALE: f64 = 32767.0;

/// Apply a hard-cutoff deadzone to a raw axis reading
///
/// Values with magnitude below the threshold are forced to exactly `0.0`;
/// everything else passes through unchanged. The remaining range is *not*
/// rescaled.
///
/// # Arguments
///
/// * `v` - Raw axis reading
/// * `dz` - Deadzone threshold (>= 0)
///
/// # Examples
///
/// ```
/// use joystick_bridge::input::conditioner::apply_deadzone;
///
/// assert_eq!(apply_deadzone(0.02, 0.05), 0.0);
/// assert_eq!(apply_deadzone(0.30, 0.05), 0.30);
/// ```
pub fn apply_deadzone(v: f64, dz: f64) -> f64 {
    if v.abs() < dz {
        0.0
    } else {
        v
    }
}

/// Clamp an axis value to the normalized `[-1, 1]` range
pub fn clamp_axis(v: f64) -> f64 {
    v.clamp(-1.0, 1.0)
}

/// Quantize a normalized axis value to a signed 16-bit integer
///
/// Clamps to `[-1, 1]` first, then truncates toward zero (an `as` cast, not
/// a round). Output is always within `[-32767, 32767]`.
///
/// # Examples
///
/// ```
/// use joystick_bridge::input::conditioner::quantize;
///
/// assert_eq!(quantize(1.0), 32767);
/// assert_eq!(quantize(-1.5), -32767); // out-of-range input is clamped
/// assert_eq!(quantize(0.0), 0);
/// ```
pub fn quantize(v: f64) -> i16 {
    (clamp_axis(v) * AXIS_SCALE) as i16
}

/// Per-axis conditioning pipeline: deadzone, optional Y inversion, clamp.
///
/// The Y inversion flag exists because stick conventions disagree: aircraft
/// style wants "stick pulled back = positive pitch", raw joysticks report the
/// opposite. It is configuration, never a hardcoded constant.
#[derive(Debug, Clone, Copy)]
pub struct AxisConditioner {
    deadzone: f64,
    invert_y: bool,
}

impl AxisConditioner {
    /// Creates a conditioner with the given deadzone threshold and Y-axis
    /// inversion flag.
    pub fn new(deadzone: f64, invert_y: bool) -> Self {
        Self { deadzone, invert_y }
    }

    /// Condition the roll (X) axis
    pub fn condition_x(&self, raw: f64) -> f64 {
        clamp_axis(apply_deadzone(raw, self.deadzone))
    }

    /// Condition the pitch (Y) axis, applying the configured inversion after
    /// the deadzone
    pub fn condition_y(&self, raw: f64) -> f64 {
        let v = apply_deadzone(raw, self.deadzone);
        let v = if self.invert_y { -v } else { v };
        clamp_axis(v)
    }
}
