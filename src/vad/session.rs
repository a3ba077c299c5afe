//! Capture session: the polling loop around [`CaptureGate`].
//!
//! The loop runs as one tokio task. Each cycle reads the energy source,
//! evaluates the gate and updates the forwarding flag that the capture
//! pipeline's [`Switch`](crate::audio::Switch) reads, then sleeps for
//! `update_interval`. The cancellation token is checked at the top of every
//! cycle and while sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::EnergySource;
use super::gate::{CaptureGate, VadTransition};
use crate::audio::level_percent;
use crate::config::VadConfig;
use crate::error::CaptureError;
use crate::state::{ClientEvent, EventSender};
use crate::task::TaskHandle;

/// The forwarding flag plus its `Listening` notifications.
#[derive(Debug, Clone)]
struct Forwarding {
    flag: Arc<AtomicBool>,
    events: EventSender,
}

impl Forwarding {
    fn set(&self, enabled: bool) {
        if self.flag.swap(enabled, Ordering::AcqRel) != enabled {
            info!(
                "Capture forwarding {}",
                if enabled { "enabled" } else { "disabled" }
            );
            self.events.emit(ClientEvent::Listening(enabled));
        }
    }

    fn is_enabled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub struct CaptureSession {
    gate: CaptureGate,
    update_interval: Duration,
    forwarding: Forwarding,
    events: EventSender,
}

impl CaptureSession {
    pub fn new(config: &VadConfig, forwarding: Arc<AtomicBool>, events: EventSender) -> Self {
        Self {
            gate: CaptureGate::new(config),
            update_interval: config.update_interval(),
            forwarding: Forwarding {
                flag: forwarding,
                events: events.clone(),
            },
            events,
        }
    }

    /// Run the polling loop on a new task.
    pub fn spawn<E>(self, source: E) -> CaptureHandle
    where
        E: EnergySource + Send + 'static,
    {
        TaskHandle::spawn(|cancel| self.run(source, cancel))
    }

    /// Poll `source` until `cancel` fires or the source reports the device gone.
    ///
    /// Whatever ends the loop, the gate is left Silent and forwarding disabled.
    pub async fn run<E: EnergySource>(
        mut self,
        mut source: E,
        cancel: CancellationToken,
    ) -> Result<(), CaptureError> {
        self.gate.reset();
        self.forwarding.set(false);
        info!(
            "Voice detection started, polling every {:?}",
            self.update_interval
        );

        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            let now = Instant::now();
            match source.current_energy() {
                Ok(Some(energy)) => {
                    self.events.emit(ClientEvent::Energy {
                        energy,
                        level_percent: level_percent(energy),
                    });
                    if let Some(transition) = self.gate.evaluate(energy, now) {
                        self.apply(transition);
                    }
                }
                Ok(None) => {
                    debug!("No energy window this cycle, retrying next cycle");
                    if let Some(transition) = self.gate.expire(now) {
                        self.apply(transition);
                    }
                }
                Err(e) => {
                    error!("Stopping voice detection: {}", e);
                    break Err(e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(self.update_interval) => {}
            }
        };

        self.halt();
        if let Err(e) = &result {
            self.events.emit(ClientEvent::Fatal(e.to_string()));
        }
        info!("Voice detection stopped");
        result
    }

    fn apply(&mut self, transition: VadTransition) {
        let voiced = transition == VadTransition::VoiceStarted;
        self.forwarding.set(voiced);
        self.events.emit(ClientEvent::VoiceDetected(voiced));
    }

    fn halt(&mut self) {
        let was_voiced = self.gate.is_voiced();
        self.gate.reset();
        self.forwarding.set(false);
        if was_voiced {
            self.events.emit(ClientEvent::VoiceDetected(false));
        }
    }
}

/// Owned handle to a running capture session.
pub type CaptureHandle = TaskHandle<CaptureError>;

/// Manual forwarding control: audio is sent only while talking.
#[derive(Debug, Clone)]
pub struct PushToTalk {
    forwarding: Forwarding,
}

impl PushToTalk {
    pub fn new(forwarding: Arc<AtomicBool>, events: EventSender) -> Self {
        let forwarding = Forwarding {
            flag: forwarding,
            events,
        };
        forwarding.set(false);
        Self { forwarding }
    }

    pub fn press(&self) {
        self.forwarding.set(true);
    }

    pub fn release(&self) {
        self.forwarding.set(false);
    }

    /// Flip between talking and not talking; returns the new state.
    pub fn toggle(&self) -> bool {
        let talking = !self.forwarding.is_enabled();
        self.forwarding.set(talking);
        talking
    }

    pub fn is_talking(&self) -> bool {
        self.forwarding.is_enabled()
    }
}
