use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

use crate::audio::AudioFrame;
use crate::error::SinkError;

/// Resolves once the frame it was returned for has finished playing.
pub type Completion = oneshot::Receiver<()>;

/// An output device that plays frames at requested times on its own clock.
pub trait OutputSink: Send {
    /// Seconds on the sink's monotonic clock.
    fn now(&self) -> f64;

    /// Play `frame` starting at `start` seconds. A start already in the past
    /// plays as soon as possible.
    fn schedule(&mut self, frame: AudioFrame, start: f64) -> Result<Completion, SinkError>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn schedule(&mut self, frame: AudioFrame, start: f64) -> Result<Completion, SinkError> {
        (**self).schedule(frame, start)
    }
}

/// Sink that keeps time with the tokio clock and discards the audio.
///
/// Used when no output device is available, and under a paused test clock.
pub struct ClockSink {
    origin: Instant,
}

impl ClockSink {
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for ClockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ClockSink {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule(&mut self, frame: AudioFrame, start: f64) -> Result<Completion, SinkError> {
        let end = (start + frame.duration_secs()).max(0.0);
        let done_at = self.origin + Duration::from_secs_f64(end);
        trace!("Frame scheduled at {:.3}s, ends at {:.3}s", start, end);

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            sleep_until(done_at).await;
            let _ = tx.send(());
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_at_frame_end() {
        let mut sink = ClockSink::new();
        let frame = AudioFrame::new(vec![0.0; 1600]).unwrap();

        let completion = sink.schedule(frame, 0.2).unwrap();
        completion.await.unwrap();

        assert!((sink.now() - 0.3).abs() < 0.002);
    }
}
