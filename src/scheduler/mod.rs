//! # Transmission Scheduler
//!
//! The fixed-rate loop at the heart of the pipeline. Each tick asks the
//! arbiter for a sample, encodes it, asks the link to transmit (subject to
//! the configured gate), and publishes the snapshot.
//!
//! Scheduling is absolute-deadline: the wake target advances by exactly one
//! period per tick regardless of how long the body took, so drift does not
//! accumulate under load (`tokio::time::interval` behaves this way; a naive
//! sleep-after-body loop does not).
//!
//! The published snapshot updates every tick regardless of the transmission
//! gate, so the telemetry bridge always reflects current input.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Interval};
use tracing::info;

use crate::config::SamplingConfig;
use crate::frame::encoder::encode_frame;
use crate::input::InputArbiter;
use crate::serial::SerialLink;
use crate::state::{PublishedSnapshot, SharedState};

/// Ticks between progress log lines (10 seconds at the default 100 Hz).
const LOG_INTERVAL_TICKS: u64 = 1000;

/// When a frame goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPolicy {
    /// Transmit every tick unconditionally
    EveryTick,
    /// Transmit only when the quantized `(xi, yi, btn)` triple changed
    /// since the last transmission
    OnChange,
}

/// Build the fixed-rate ticker for a sample rate.
pub(crate) fn tick_interval(rate_hz: u32) -> Interval {
    interval(Duration::from_secs_f64(1.0 / rate_hz as f64))
}

/// Whether this tick's triple goes on the wire under the given policy.
fn should_transmit(
    policy: TxPolicy,
    last_sent: Option<(i16, i16, u8)>,
    current: (i16, i16, u8),
) -> bool {
    match policy {
        TxPolicy::EveryTick => true,
        TxPolicy::OnChange => last_sent != Some(current),
    }
}

/// Fixed-rate transmission scheduler.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    rate_hz: u32,
    policy: TxPolicy,
}

impl Scheduler {
    /// Build a scheduler from the sampling config.
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            rate_hz: config.rate_hz,
            policy: if config.send_on_change {
                TxPolicy::OnChange
            } else {
                TxPolicy::EveryTick
            },
        }
    }

    /// Configured sample rate in Hz.
    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Run the loop until the stop flag is set.
    ///
    /// The stop flag is observed at the top of each tick; on stop the serial
    /// link is closed before returning, whatever state it was in.
    pub async fn run(
        &self,
        mut arbiter: InputArbiter,
        mut link: SerialLink,
        state: Arc<SharedState>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            "Starting transmission loop at {} Hz ({:?})",
            self.rate_hz, self.policy
        );

        let mut ticker = tick_interval(self.rate_hz);
        let mut last_sent: Option<(i16, i16, u8)> = None;
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let override_state = state.override_state();
                    let sample = arbiter.sample(&override_state);
                    let frame = encode_frame(&sample);
                    let triple = sample.quantized_triple();

                    if should_transmit(self.policy, last_sent, triple) {
                        link.send_frame(&frame).await;
                        // The gate tracks the decision to transmit, not the
                        // physical outcome, so simulation mode behaves
                        // identically to hardware mode.
                        last_sent = Some(triple);
                    }

                    state.publish(PublishedSnapshot {
                        sample,
                        frame,
                        link_mode: link.mode(),
                    });

                    tick_count += 1;
                    if tick_count % LOG_INTERVAL_TICKS == 0 {
                        info!(
                            "Published {} samples ({} Hz, link {:?})",
                            tick_count,
                            self.rate_hz,
                            link.mode()
                        );
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Transmission loop stopped after {} ticks", tick_count);
        link.close();
    }
}
