//! Playback session: drives a [`PlaybackScheduler`] from one tokio task.
//!
//! The loop waits on four things: cancellation, transport events, the
//! completion of the frame currently playing, and the short settle delay that
//! follows each completion before the next frame is scheduled.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot::error::RecvError;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::scheduler::{PlaybackScheduler, ScheduleOutcome};
use super::sink::{Completion, OutputSink};
use crate::audio::PcmDecoder;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, SinkError};
use crate::io::network::TransportEvent;
use crate::pipeline::Node;
use crate::state::{ClientEvent, EventSender};
use crate::task::TaskHandle;

pub type PlaybackHandle = TaskHandle<PlaybackError>;

pub struct PlaybackSession<S> {
    scheduler: PlaybackScheduler,
    sink: S,
    decoder: PcmDecoder,
    settle_delay: Duration,
    events: EventSender,
    pending: Option<Completion>,
    settle_at: Option<Instant>,
}

impl<S: OutputSink + 'static> PlaybackSession<S> {
    pub fn new(config: &PlaybackConfig, sink: S, events: EventSender) -> Self {
        Self {
            scheduler: PlaybackScheduler::new(config),
            sink,
            decoder: PcmDecoder,
            settle_delay: config.settle_delay(),
            events,
            pending: None,
            settle_at: None,
        }
    }

    pub fn spawn(self, incoming: mpsc::Receiver<TransportEvent>) -> PlaybackHandle {
        TaskHandle::spawn(|cancel| self.run(incoming, cancel))
    }

    /// Play incoming frames until `cancel` fires, the transport goes away, or
    /// the sink fails.
    pub async fn run(
        mut self,
        mut incoming: mpsc::Receiver<TransportEvent>,
        cancel: CancellationToken,
    ) -> Result<(), PlaybackError> {
        info!("Playback started");

        let result = loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                done = wait_for(&mut self.pending) => {
                    self.pending = None;
                    self.on_completion(done)
                }
                _ = wait_until(self.settle_at) => {
                    self.settle_at = None;
                    self.advance()
                }
                event = incoming.recv() => match event {
                    Some(event) => self.on_transport(event),
                    None => break Ok(()),
                },
            };
            if let Err(e) = step {
                break Err(e);
            }
        };

        if let Err(e) = &result {
            error!("Playback halted: {}", e);
            self.scheduler.fail();
            self.events.emit(ClientEvent::Fatal(e.to_string()));
        }
        info!("Playback stopped");
        result
    }

    fn on_completion(&mut self, done: Result<(), RecvError>) -> Result<(), PlaybackError> {
        if done.is_err() {
            return Err(SinkError::Closed.into());
        }
        self.settle_at = Some(Instant::now() + self.settle_delay);
        Ok(())
    }

    fn advance(&mut self) -> Result<(), PlaybackError> {
        match self.scheduler.dequeue_and_schedule(&mut self.sink)? {
            ScheduleOutcome::Scheduled { completion, .. } => self.pending = Some(completion),
            ScheduleOutcome::Idle => debug!("Jitter queue drained, playback idle"),
        }
        self.report();
        Ok(())
    }

    fn on_transport(&mut self, event: TransportEvent) -> Result<(), PlaybackError> {
        match event {
            TransportEvent::Frame(payload) => {
                let Some(frame) = self.decoder.process(payload) else {
                    return Ok(());
                };
                if let Some(completion) = self.scheduler.enqueue(frame, &mut self.sink)? {
                    self.pending = Some(completion);
                }
                self.report();
            }
            TransportEvent::Connected => debug!("Transport connected"),
            TransportEvent::Disconnected => {
                info!("Transport disconnected, clearing playback state");
                self.pending = None;
                self.settle_at = None;
                self.scheduler.reset(self.sink.now());
                self.report();
            }
        }
        Ok(())
    }

    fn report(&self) {
        let status = self.scheduler.status(self.sink.now());
        self.events.emit(ClientEvent::Status(status));
    }
}

async fn wait_for(pending: &mut Option<Completion>) -> Result<(), RecvError> {
    match pending {
        Some(completion) => completion.await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
