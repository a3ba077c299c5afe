//! Error types for the capture and playback sessions.
//!
//! Library code returns these typed errors so callers can tell a dead device
//! from a malformed packet; the binary and the I/O adapters wrap them in
//! `anyhow` with context.

use thiserror::Error;

/// Errors while converting between wire PCM and [`AudioFrame`](crate::audio::AudioFrame).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("PCM payload of {0} bytes is not a whole number of 16-bit samples")]
    OddLength(usize),

    #[error("data length {len} must be a multiple of channels {channels}")]
    ChannelMismatch { len: usize, channels: usize },
}

/// Errors raised by the capture side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The microphone went away mid-session. Fatal for the capture session.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Errors raised by an [`OutputSink`](crate::playback::OutputSink).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("output device closed")]
    Closed,

    #[error("output device rejected frame: {0}")]
    Rejected(String),
}

/// Errors raised by the playback scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("output sink failed: {0}")]
    SinkRejected(#[from] SinkError),

    /// A previous sink failure halted the scheduler for this session.
    #[error("playback halted after an earlier sink failure")]
    Halted,
}

/// Errors while loading or validating [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
