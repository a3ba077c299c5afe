//! Adaptive buffer target.
//!
//! Once per received frame the controller compares how far ahead of the output
//! clock audio is scheduled (`remaining`) with the previous observation. A jump
//! of more than [`LATENCY_TOLERANCE`] grows the target; a comparable drop
//! shrinks it, but only once the buffer has drained below half the target.

use tracing::debug;

use crate::config::PlaybackConfig;

pub const GROW_FACTOR: f64 = 1.1;
pub const SHRINK_FACTOR: f64 = 0.9;
/// Latency change, in seconds, that counts as a trend.
pub const LATENCY_TOLERANCE: f64 = 0.05;
/// Shrinking is allowed only while `remaining` is below this share of the target.
pub const SHRINK_HEADROOM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAdjustment {
    Grew,
    Shrank,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct BufferSizeController {
    target_buffer_seconds: f64,
    last_observed_latency: f64,
    min_buffer_seconds: f64,
    max_buffer_seconds: f64,
}

impl BufferSizeController {
    pub fn new(config: &PlaybackConfig) -> Self {
        let min = config.min_buffer_seconds;
        let max = config.max_buffer_seconds.max(min);
        Self {
            target_buffer_seconds: config.initial_buffer_seconds.clamp(min, max),
            last_observed_latency: 0.0,
            min_buffer_seconds: min,
            max_buffer_seconds: max,
        }
    }

    pub fn target(&self) -> f64 {
        self.target_buffer_seconds
    }

    pub fn last_observed_latency(&self) -> f64 {
        self.last_observed_latency
    }

    /// Feed one latency observation, `remaining = scheduled_time - now`.
    pub fn observe(&mut self, remaining: f64) -> BufferAdjustment {
        let delta = remaining - self.last_observed_latency;
        self.last_observed_latency = remaining;

        if delta > LATENCY_TOLERANCE {
            self.target_buffer_seconds =
                (self.target_buffer_seconds * GROW_FACTOR).min(self.max_buffer_seconds);
            debug!(
                "Latency rose by {:.3}s, buffer target now {:.3}s",
                delta, self.target_buffer_seconds
            );
            BufferAdjustment::Grew
        } else if delta < -LATENCY_TOLERANCE
            && remaining < self.target_buffer_seconds * SHRINK_HEADROOM
        {
            self.target_buffer_seconds =
                (self.target_buffer_seconds * SHRINK_FACTOR).max(self.min_buffer_seconds);
            debug!(
                "Latency fell by {:.3}s, buffer target now {:.3}s",
                -delta, self.target_buffer_seconds
            );
            BufferAdjustment::Shrank
        } else {
            BufferAdjustment::Unchanged
        }
    }

    /// Forget the last observation. The target is kept.
    pub fn reset_observation(&mut self) {
        self.last_observed_latency = 0.0;
    }
}
