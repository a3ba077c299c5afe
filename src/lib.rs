//! Real-time duplex voice client.
//!
//! Captured microphone audio is forwarded to a WebSocket peer only while a
//! voice activity gate (or push-to-talk) allows it. Audio received from the
//! peer is played through an adaptive jitter buffer.
//!
//! - [`audio`] - frames, wire PCM codec, capture-side pipeline nodes
//! - [`pipeline`] - push-based node chaining
//! - [`vad`] - capture gate and its polling session
//! - [`playback`] - jitter queue, buffer controller, scheduler and session
//! - [`io`] - WebSocket transport and cpal devices
//! - [`state`] - events reported to the UI
//! - [`ui`] - terminal status view

pub mod audio;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod playback;
pub mod state;
pub mod task;
pub mod ui;
pub mod vad;
