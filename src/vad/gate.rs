//! Voice activity state machine.
//!
//! Two thresholds give hysteresis:
//! - `voice_threshold` (higher) enters [`VadState::Voiced`] immediately
//! - `silence_threshold` (lower) only starts a countdown; the gate falls back to
//!   [`VadState::Silent`] once `silence_timeout` passes without energy climbing
//!   back above `silence_threshold`
//!
//! Energies between the two thresholds never change state. While a countdown is
//! pending they cancel it, which keeps a decaying voice tail from chattering.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::VadConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    #[default]
    Silent,
    Voiced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    VoiceStarted,
    VoiceEnded,
}

#[derive(Debug)]
pub struct CaptureGate {
    voice_threshold: f64,
    silence_threshold: f64,
    silence_timeout: Duration,
    state: VadState,
    silence_deadline: Option<Instant>,
    energy: f64,
}

impl CaptureGate {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            voice_threshold: config.voice_threshold,
            silence_threshold: config.silence_threshold,
            silence_timeout: config.silence_timeout(),
            state: VadState::Silent,
            silence_deadline: None,
            energy: 0.0,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn is_voiced(&self) -> bool {
        self.state == VadState::Voiced
    }

    /// Last energy passed to [`evaluate`](Self::evaluate).
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn silence_deadline(&self) -> Option<Instant> {
        self.silence_deadline
    }

    /// Back to Silent with no countdown pending.
    pub fn reset(&mut self) {
        self.state = VadState::Silent;
        self.silence_deadline = None;
        self.energy = 0.0;
    }

    /// Fire the silence countdown if it has run out by `now`.
    pub fn expire(&mut self, now: Instant) -> Option<VadTransition> {
        let deadline = self.silence_deadline?;
        if now < deadline {
            return None;
        }
        self.silence_deadline = None;
        self.state = VadState::Silent;
        debug!("Silence countdown elapsed, voice ended");
        Some(VadTransition::VoiceEnded)
    }

    /// Run one polling cycle with the freshly measured `energy`.
    ///
    /// A cycle that expires the countdown reports only that transition; the
    /// energy sample is still recorded and the next cycle may re-enter Voiced.
    pub fn evaluate(&mut self, energy: f64, now: Instant) -> Option<VadTransition> {
        self.energy = energy;

        if let Some(transition) = self.expire(now) {
            return Some(transition);
        }

        match self.state {
            VadState::Silent => {
                if energy > self.voice_threshold {
                    self.silence_deadline = None;
                    self.state = VadState::Voiced;
                    debug!("Energy {:.4} above voice threshold, voice started", energy);
                    return Some(VadTransition::VoiceStarted);
                }
            }
            VadState::Voiced => {
                if energy < self.silence_threshold {
                    if self.silence_deadline.is_none() {
                        self.silence_deadline = Some(now + self.silence_timeout);
                        debug!(
                            "Energy {:.4} below silence threshold, countdown {:?} started",
                            energy, self.silence_timeout
                        );
                    }
                } else if energy > self.silence_threshold && self.silence_deadline.take().is_some()
                {
                    debug!("Energy {:.4} recovered, silence countdown cancelled", energy);
                }
            }
        }

        None
    }
}
