//! # Joystick Device Module
//!
//! Joystick detection and polling via the Linux evdev interface.
//!
//! Detection is capability-based, not vendor-based: any device advertising
//! `ABS_X`/`ABS_Y` plus a joystick or gamepad button class qualifies. This
//! happens once at startup; the arbiter holds the result and never re-probes.
//!
//! Axis values are read with the polled state queries (`get_abs_state`)
//! rather than the event stream, so a read never blocks the fixed-rate loop.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// Base key code for joystick buttons (BTN_TRIGGER).
const BTN_JOYSTICK_BASE: u16 = 0x120;

/// Base key code for gamepad buttons (BTN_SOUTH).
const BTN_GAMEPAD_BASE: u16 = 0x130;

/// Polled axis/button source shared by the arbiter and its tests.
pub trait AxisSource: Send {
    /// Read both axes, normalized to `[-1, 1]`.
    fn read_axes(&mut self) -> Result<(f64, f64)>;

    /// Read the button at the configured index. A missing button reads as
    /// released.
    fn read_button(&mut self, index: u8) -> Result<bool>;
}

/// An open joystick device.
pub struct Joystick {
    device: Device,
    device_path: String,
}

impl Joystick {
    /// Detect and open the first joystick on the system.
    ///
    /// Scans `/dev/input/event*` in path order for a device with both stick
    /// axes and a joystick/gamepad button.
    ///
    /// # Errors
    ///
    /// - `JoystickNotFound`: no qualifying device on the system
    /// - `Joystick`: `/dev/input` unreadable
    pub fn detect() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(BridgeError::Joystick(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| BridgeError::Joystick(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::Joystick(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic selection when several devices are attached
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let Some(filename) = path.file_name() else {
                continue;
            };
            if !filename.to_string_lossy().starts_with("event") {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    if Self::looks_like_joystick(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "Using joystick {} at {}",
                            device.name().unwrap_or("unknown"),
                            device_path
                        );
                        return Ok(Self {
                            device,
                            device_path,
                        });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors: skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(BridgeError::JoystickNotFound)
    }

    /// Whether a device advertises stick axes plus a joystick/gamepad button.
    ///
    /// The button requirement screens out touchpads and tablets, which also
    /// report `ABS_X`/`ABS_Y`.
    fn looks_like_joystick(device: &Device) -> bool {
        let has_axes = device.supported_absolute_axes().map_or(false, |axes| {
            axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y)
        });

        let has_button = device.supported_keys().map_or(false, |keys| {
            keys.contains(Key::BTN_TRIGGER) || keys.contains(Key::BTN_SOUTH)
        });

        has_axes && has_button
    }

    /// The `/dev/input/eventX` path this joystick was opened from.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl AxisSource for Joystick {
    fn read_axes(&mut self) -> Result<(f64, f64)> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| BridgeError::Joystick(format!("Failed to read axis state: {}", e)))?;

        let x_info = abs[AbsoluteAxisType::ABS_X.0 as usize];
        let y_info = abs[AbsoluteAxisType::ABS_Y.0 as usize];

        Ok((
            normalize_axis(x_info.value, x_info.minimum, x_info.maximum),
            normalize_axis(y_info.value, y_info.minimum, y_info.maximum),
        ))
    }

    fn read_button(&mut self, index: u8) -> Result<bool> {
        let keys = self
            .device
            .get_key_state()
            .map_err(|e| BridgeError::Joystick(format!("Failed to read key state: {}", e)))?;

        // Flight sticks number buttons from BTN_TRIGGER, gamepads from
        // BTN_SOUTH; accept either so "button 0" means the obvious thing
        // on both.
        let joystick_key = Key::new(BTN_JOYSTICK_BASE + index as u16);
        let gamepad_key = Key::new(BTN_GAMEPAD_BASE + index as u16);

        Ok(keys.contains(joystick_key) || keys.contains(gamepad_key))
    }
}

/// Normalize a raw absolute axis value into `[-1, 1]` using the
/// device-reported range.
///
/// A degenerate range (min >= max) normalizes to `0.0`.
///
/// # Examples
///
/// ```
/// use joystick_bridge::input::joystick::normalize_axis;
///
/// assert_eq!(normalize_axis(255, 0, 255), 1.0);
/// assert_eq!(normalize_axis(0, 0, 255), -1.0);
/// ```
pub fn normalize_axis(value: i32, min: i32, max: i32) -> f64 {
    if min >= max {
        return 0.0;
    }

    // Widen before subtracting: a full i32 range overflows i32 arithmetic
    let span = (max as i64 - min as i64) as f64;
    let offset = (value as i64 - min as i64) as f64;
    (offset / span) * 2.0 - 1.0
}
