//! # Input Source Arbiter
//!
//! Chooses, each tick, between the remote override, the joystick, and
//! neutral defaults.
//!
//! Precedence is fixed: an active override wins regardless of the configured
//! mode. It is a sticky, one-directional takeover by the external visualizer
//! with no automatic hand-back to the joystick. Without an active override,
//! the joystick feeds the sample when one was detected at startup; otherwise
//! the sample is neutral `(0, 0, 0)`.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::InputConfig;
use crate::error::Result;
use crate::input::conditioner::AxisConditioner;
use crate::input::joystick::{AxisSource, Joystick};
use crate::state::{OverrideState, Sample};

/// Which input source feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Joystick required; missing device at startup is fatal
    Joystick,
    /// Override only; no joystick is opened
    Override,
    /// Joystick if one is detected at startup, override/neutral otherwise
    Auto,
}

/// Per-tick input source arbitration.
pub struct InputArbiter {
    source: Option<Box<dyn AxisSource>>,
    conditioner: AxisConditioner,
    button_index: u8,
}

impl InputArbiter {
    /// Set up the arbiter from config, detecting the joystick once.
    ///
    /// # Errors
    ///
    /// Fails only in forced-joystick mode with no device present; this is
    /// fatal and must abort the process before the loop starts. In auto mode
    /// a missing joystick just logs and continues.
    pub fn new(config: &InputConfig) -> Result<Self> {
        let source: Option<Box<dyn AxisSource>> = match config.mode {
            InputMode::Joystick => Some(Box::new(Joystick::detect()?)),
            InputMode::Override => None,
            InputMode::Auto => match Joystick::detect() {
                Ok(joystick) => Some(Box::new(joystick)),
                Err(e) => {
                    info!("No joystick available ({}), waiting for override input", e);
                    None
                }
            },
        };

        Ok(Self {
            source,
            conditioner: AxisConditioner::new(config.deadzone, config.invert_y),
            button_index: config.button_index,
        })
    }

    /// Build an arbiter around an explicit source (or none). Used by tests
    /// and by embedders that provide their own device layer.
    pub fn with_source(
        source: Option<Box<dyn AxisSource>>,
        conditioner: AxisConditioner,
        button_index: u8,
    ) -> Self {
        Self {
            source,
            conditioner,
            button_index,
        }
    }

    /// Whether a joystick was detected at startup.
    pub fn has_joystick(&self) -> bool {
        self.source.is_some()
    }

    /// Produce this tick's sample.
    ///
    /// Override values are clamped but not deadzoned: the visualizer page
    /// already maps its pointer to clean `[-1, 1]` coordinates.
    pub fn sample(&mut self, override_state: &OverrideState) -> Sample {
        if override_state.active {
            return Sample::new(override_state.x, override_state.y, override_state.btn);
        }

        if let Some(source) = self.source.as_mut() {
            match source.read_axes() {
                Ok((raw_x, raw_y)) => {
                    let x = self.conditioner.condition_x(raw_x);
                    let y = self.conditioner.condition_y(raw_y);
                    let btn = match source.read_button(self.button_index) {
                        Ok(pressed) => u8::from(pressed),
                        Err(e) => {
                            debug!("Button read failed: {}", e);
                            0
                        }
                    };
                    return Sample::new(x, y, btn);
                }
                Err(e) => {
                    // A transient device error yields a neutral tick rather
                    // than disturbing the frame cadence.
                    warn!("Joystick read failed: {}", e);
                }
            }
        }

        Sample::neutral()
    }
}
