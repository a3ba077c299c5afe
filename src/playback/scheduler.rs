//! Jitter-buffered playback scheduling.
//!
//! Frames are queued on arrival and handed to the [`OutputSink`] back to back:
//! each one starts at `scheduled_time`, which then advances by the frame's
//! duration. Playback goes idle when the queue runs dry and restarts on the
//! next arrival, scheduling from the current clock.

use tracing::{debug, error};

use super::controller::{BufferAdjustment, BufferSizeController};
use super::queue::JitterQueue;
use super::sink::{Completion, OutputSink};
use crate::audio::AudioFrame;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::state::PlaybackStatus;

#[derive(Debug)]
pub enum ScheduleOutcome {
    /// A frame was handed to the sink at `start`.
    Scheduled { start: f64, completion: Completion },
    /// The queue is empty; playback is idle until the next arrival.
    Idle,
}

#[derive(Debug)]
pub struct PlaybackScheduler {
    queue: JitterQueue,
    scheduled_time: f64,
    playing: bool,
    controller: BufferSizeController,
    prebuffer_on_restart: bool,
    failed: bool,
}

impl PlaybackScheduler {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            queue: JitterQueue::new(config.max_queued_frames),
            scheduled_time: 0.0,
            playing: false,
            controller: BufferSizeController::new(config),
            prebuffer_on_restart: config.prebuffer_on_restart,
            failed: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn scheduled_time(&self) -> f64 {
        self.scheduled_time
    }

    pub fn target_buffer_seconds(&self) -> f64 {
        self.controller.target()
    }

    pub fn queue(&self) -> &JitterQueue {
        &self.queue
    }

    /// Accept a newly arrived frame.
    ///
    /// Returns the completion of the frame scheduled if this arrival restarted
    /// idle playback. While playing, the frame just waits in the queue.
    pub fn enqueue<S>(
        &mut self,
        frame: AudioFrame,
        sink: &mut S,
    ) -> Result<Option<Completion>, PlaybackError>
    where
        S: OutputSink + ?Sized,
    {
        if self.failed {
            return Err(PlaybackError::Halted);
        }

        let now = sink.now();
        if self.controller.observe(self.scheduled_time - now) != BufferAdjustment::Unchanged {
            debug!(
                "Buffer target adjusted to {:.3}s",
                self.controller.target()
            );
        }

        self.queue.push(frame);
        if self.playing {
            return Ok(None);
        }

        let lead = if self.prebuffer_on_restart {
            self.controller.target()
        } else {
            0.0
        };
        self.scheduled_time = self.scheduled_time.max(now + lead);
        debug!("Playback restarting at {:.3}s", self.scheduled_time);

        match self.dequeue_and_schedule(sink)? {
            ScheduleOutcome::Scheduled { completion, .. } => Ok(Some(completion)),
            ScheduleOutcome::Idle => Ok(None),
        }
    }

    /// Hand the head of the queue to the sink, or go idle if there is none.
    pub fn dequeue_and_schedule<S>(&mut self, sink: &mut S) -> Result<ScheduleOutcome, PlaybackError>
    where
        S: OutputSink + ?Sized,
    {
        if self.failed {
            return Err(PlaybackError::Halted);
        }

        let Some(frame) = self.queue.pop() else {
            self.playing = false;
            return Ok(ScheduleOutcome::Idle);
        };

        let start = self.scheduled_time;
        let duration = frame.duration_secs();
        match sink.schedule(frame, start) {
            Ok(completion) => {
                self.scheduled_time += duration;
                self.playing = true;
                Ok(ScheduleOutcome::Scheduled { start, completion })
            }
            Err(e) => {
                error!("Output sink rejected frame at {:.3}s: {}", start, e);
                self.fail();
                Err(e.into())
            }
        }
    }

    /// Stop for good: drop everything queued and refuse further work.
    pub fn fail(&mut self) {
        self.failed = true;
        self.playing = false;
        self.queue.clear();
    }

    /// Return to an empty idle state with the clock at `now`.
    pub fn reset(&mut self, now: f64) {
        self.queue.clear();
        self.playing = false;
        self.scheduled_time = now;
        self.controller.reset_observation();
    }

    pub fn status(&self, now: f64) -> PlaybackStatus {
        PlaybackStatus {
            buffer_seconds: self.controller.target(),
            latency_ms: (self.scheduled_time - now).max(0.0) * 1000.0,
            queue_depth: self.queue.len(),
            playing: self.playing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use tokio::sync::oneshot;

    /// Sink with a hand-driven clock that records start times.
    struct ManualSink {
        now: f64,
        starts: Vec<f64>,
        reject: bool,
    }

    impl ManualSink {
        fn new() -> Self {
            Self {
                now: 0.0,
                starts: Vec::new(),
                reject: false,
            }
        }
    }

    impl OutputSink for ManualSink {
        fn now(&self) -> f64 {
            self.now
        }

        fn schedule(&mut self, _frame: AudioFrame, start: f64) -> Result<Completion, SinkError> {
            if self.reject {
                return Err(SinkError::Rejected("device gone".to_string()));
            }
            self.starts.push(start);
            let (_tx, rx) = oneshot::channel();
            Ok(rx)
        }
    }

    fn frame_100ms() -> AudioFrame {
        AudioFrame::new(vec![0.0; 1600]).unwrap()
    }

    fn assert_starts(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_back_to_back_frames_then_idle() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();

        let first = scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        assert!(first.is_some());
        for _ in 0..4 {
            assert!(scheduler.enqueue(frame_100ms(), &mut sink).unwrap().is_none());
        }
        assert_eq!(scheduler.queue().len(), 4);

        for step in 1..=4 {
            sink.now = step as f64 * 0.1;
            assert!(matches!(
                scheduler.dequeue_and_schedule(&mut sink).unwrap(),
                ScheduleOutcome::Scheduled { .. }
            ));
        }
        sink.now = 0.5;
        assert!(matches!(
            scheduler.dequeue_and_schedule(&mut sink).unwrap(),
            ScheduleOutcome::Idle
        ));

        assert_starts(&sink.starts, &[0.0, 0.1, 0.2, 0.3, 0.4]);
        assert!(!scheduler.is_playing());
        assert!((scheduler.scheduled_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_arrival_order_is_kept() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();
        let frames: Vec<AudioFrame> = (1..=3)
            .map(|n| AudioFrame::new(vec![0.0; 160 * n]).unwrap())
            .collect();

        for frame in &frames {
            scheduler.enqueue(frame.clone(), &mut sink).unwrap();
        }
        while let ScheduleOutcome::Scheduled { .. } =
            scheduler.dequeue_and_schedule(&mut sink).unwrap()
        {}

        // Starts advance by each frame's own duration: 10 ms, then 20 ms.
        assert_starts(&sink.starts, &[0.0, 0.01, 0.03]);
    }

    #[test]
    fn test_idle_restart_schedules_from_now() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();

        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        sink.now = 0.1;
        scheduler.dequeue_and_schedule(&mut sink).unwrap();

        sink.now = 2.0;
        assert!(scheduler.enqueue(frame_100ms(), &mut sink).unwrap().is_some());
        assert_starts(&sink.starts, &[0.0, 2.0]);
        assert!(scheduler.is_playing());
    }

    #[test]
    fn test_prebuffer_delays_restart_by_target() {
        let config = PlaybackConfig {
            prebuffer_on_restart: true,
            ..PlaybackConfig::default()
        };
        let mut scheduler = PlaybackScheduler::new(&config);
        let mut sink = ManualSink::new();
        sink.now = 1.0;

        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        let expected = 1.0 + scheduler.target_buffer_seconds();
        assert_starts(&sink.starts, &[expected]);
    }

    #[test]
    fn test_rejection_halts_and_clears_queue() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();

        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();

        sink.reject = true;
        let err = scheduler.dequeue_and_schedule(&mut sink).unwrap_err();
        assert!(matches!(err, PlaybackError::SinkRejected(_)));
        assert!(scheduler.is_failed());
        assert!(scheduler.queue().is_empty());

        sink.reject = false;
        assert!(matches!(
            scheduler.enqueue(frame_100ms(), &mut sink),
            Err(PlaybackError::Halted)
        ));
        assert_eq!(sink.starts.len(), 1);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();
        for _ in 0..3 {
            scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        }

        scheduler.reset(0.05);
        assert!(!scheduler.is_playing());
        assert!(scheduler.queue().is_empty());
        assert_eq!(scheduler.scheduled_time(), 0.05);

        sink.now = 0.07;
        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        assert_starts(&sink.starts, &[0.0, 0.07]);
    }

    #[test]
    fn test_overflow_drops_oldest_waiting_frame() {
        let config = PlaybackConfig {
            max_queued_frames: 2,
            ..PlaybackConfig::default()
        };
        let mut scheduler = PlaybackScheduler::new(&config);
        let mut sink = ManualSink::new();

        for _ in 0..4 {
            scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        }
        assert_eq!(scheduler.queue().len(), 2);
        assert_eq!(scheduler.queue().dropped_frames(), 1);
    }

    #[test]
    fn test_status_reports_target_and_latency() {
        let mut scheduler = PlaybackScheduler::new(&PlaybackConfig::default());
        let mut sink = ManualSink::new();
        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();
        scheduler.enqueue(frame_100ms(), &mut sink).unwrap();

        let status = scheduler.status(0.04);
        assert!((status.latency_ms - 60.0).abs() < 1e-6);
        assert_eq!(status.queue_depth, 1);
        assert!(status.playing);
        // The second arrival saw latency jump by 100 ms and grew the target.
        assert!((status.buffer_seconds - 0.11).abs() < 1e-9);
    }
}
