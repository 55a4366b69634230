//! # Shared State Module
//!
//! The two values shared between the scheduler loop and the telemetry
//! bridge: the published snapshot (written by the scheduler) and the
//! override state (written by the telemetry bridge).
//!
//! Both live in `tokio::sync::watch` channels and are replaced as whole
//! values, never mutated field by field. Staleness of one tick is
//! acceptable; a torn read of mixed old/new fields is not. Ownership is
//! single-writer per value: the scheduler owns the snapshot, the telemetry
//! bridge owns the override.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::frame::encoder::encode_frame;
use crate::frame::protocol::Frame;
use crate::input::conditioner::{clamp_axis, quantize};
use crate::serial::LinkMode;

/// Current wall-clock time as fractional unix seconds.
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// One conditioned, quantized input sample.
///
/// Created once per scheduler tick and immutable afterwards; superseded by
/// the next tick's sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Conditioned roll axis, in `[-1, 1]`
    pub x: f64,
    /// Conditioned pitch axis, in `[-1, 1]`
    pub y: f64,
    /// Quantized roll axis
    pub xi: i16,
    /// Quantized pitch axis
    pub yi: i16,
    /// Button state (0 or 1)
    pub btn: u8,
    /// Creation time, fractional unix seconds
    pub timestamp: f64,
}

impl Sample {
    /// Build a sample from conditioned axis values and a button state.
    ///
    /// Axes are clamped to `[-1, 1]` and quantized by truncation toward
    /// zero; the button is coerced to 0/1.
    ///
    /// # Examples
    ///
    /// ```
    /// use joystick_bridge::state::Sample;
    ///
    /// let sample = Sample::new(0.5, -1.5, 3);
    /// assert_eq!(sample.y, -1.0); // clamped
    /// assert_eq!(sample.yi, -32767);
    /// assert_eq!(sample.btn, 1); // coerced
    /// ```
    pub fn new(x: f64, y: f64, btn: u8) -> Self {
        let x = clamp_axis(x);
        let y = clamp_axis(y);
        Self {
            x,
            y,
            xi: quantize(x),
            yi: quantize(y),
            btn: u8::from(btn != 0),
            timestamp: unix_timestamp(),
        }
    }

    /// The neutral sample `(0, 0, 0)` used when no input source is available.
    pub fn neutral() -> Self {
        Self::new(0.0, 0.0, 0)
    }

    /// The `(xi, yi, btn)` triple the send-on-change gate compares.
    pub fn quantized_triple(&self) -> (i16, i16, u8) {
        (self.xi, self.yi, self.btn)
    }
}

/// Remote override written by the external visualizer page.
///
/// Last-writer-wins snapshot with no ordering guarantee relative to
/// scheduler ticks. Once `active`, the override wins the arbitration every
/// tick until it is explicitly disabled (or the process restarts).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideState {
    /// Whether the override currently owns the input
    pub active: bool,
    /// Override roll axis, in `[-1, 1]`
    pub x: f64,
    /// Override pitch axis, in `[-1, 1]`
    pub y: f64,
    /// Override button state (0 or 1)
    pub btn: u8,
}

/// A partial override update from the visualizer.
///
/// Only the supplied fields are merged; malformed values are dropped
/// field-by-field when the request is parsed, so a `None` here means
/// "leave unchanged".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverridePatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub btn: Option<u8>,
    pub enabled: Option<bool>,
}

impl OverridePatch {
    /// True if the patch carries at least one input field (`x`, `y`, `btn`).
    pub fn has_input_field(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.btn.is_some()
    }
}

/// The sole externally visible state, replaced wholesale each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSnapshot {
    /// The tick's sample
    pub sample: Sample,
    /// The frame derived from the sample
    pub frame: Frame,
    /// Link mode at publication time
    pub link_mode: LinkMode,
}

impl PublishedSnapshot {
    fn initial() -> Self {
        let sample = Sample::neutral();
        let frame = encode_frame(&sample);
        Self {
            sample,
            frame,
            link_mode: LinkMode::Closed,
        }
    }
}

/// Shared state holder handed to both the scheduler and the telemetry
/// bridge.
#[derive(Debug)]
pub struct SharedState {
    snapshot_tx: watch::Sender<PublishedSnapshot>,
    override_tx: watch::Sender<OverrideState>,
}

impl SharedState {
    /// Create a shared state holder seeded with a neutral snapshot and an
    /// inactive override.
    pub fn new() -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(PublishedSnapshot::initial());
        let (override_tx, _) = watch::channel(OverrideState::default());
        Arc::new(Self {
            snapshot_tx,
            override_tx,
        })
    }

    /// Replace the published snapshot (scheduler only).
    pub fn publish(&self, snapshot: PublishedSnapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Read the latest published snapshot. Never blocks.
    pub fn snapshot(&self) -> PublishedSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Read the latest override state. Never blocks.
    pub fn override_state(&self) -> OverrideState {
        self.override_tx.borrow().clone()
    }

    /// Merge a partial override update (telemetry bridge only).
    ///
    /// Supplied axes are clamped to `[-1, 1]` and the button is coerced to
    /// 0/1. Supplying any input field activates the override unless an
    /// explicit `enabled` value says otherwise. Idempotent.
    pub fn apply_override(&self, patch: &OverridePatch) {
        let mut next = self.override_tx.borrow().clone();

        if let Some(x) = patch.x {
            next.x = clamp_axis(x);
        }
        if let Some(y) = patch.y {
            next.y = clamp_axis(y);
        }
        if let Some(btn) = patch.btn {
            next.btn = u8::from(btn != 0);
        }

        match patch.enabled {
            Some(enabled) => next.active = enabled,
            None => {
                if patch.has_input_field() {
                    next.active = true;
                }
            }
        }

        self.override_tx.send_replace(next);
    }
}
