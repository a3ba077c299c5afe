//! Adaptive jitter-buffered playback.
//!
//! - [`queue`] - bounded FIFO of frames waiting to play
//! - [`controller`] - feedback loop that adapts the buffer target to latency
//! - [`sink`] - the output device seam, plus a clock-only sink
//! - [`scheduler`] - places frames back to back on the sink clock
//! - [`session`] - the tokio task that drives the scheduler

pub mod controller;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod sink;

pub use controller::{BufferAdjustment, BufferSizeController};
pub use queue::JitterQueue;
pub use scheduler::{PlaybackScheduler, ScheduleOutcome};
pub use session::{PlaybackHandle, PlaybackSession};
pub use sink::{ClockSink, Completion, OutputSink};
