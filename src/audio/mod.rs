//! Audio data types, wire codec, and capture-side effects.
//!
//! # Data Types
//! - [`AudioSample`] - Trait for sample types (`f32`, `i16`)
//! - [`frame::AudioBuffer`] - An immutable buffer of interleaved samples
//! - [`AudioFrame`] - The mono 16 kHz `f32` buffer the client moves around
//!
//! # Codec
//! - [`codec`] - 16-bit little-endian PCM, the only wire format
//!
//! # Effects
//! - [`effects::batcher`] - Wire-sized blocks from device callbacks
//! - [`effects::level_meter`] - RMS energy and the shared energy window
//! - [`effects::switch`] - Forwarding gate

pub mod codec;
pub mod effects;
pub mod frame;
pub mod sample;

pub use codec::{PcmDecoder, PcmEncoder};
pub use effects::{AudioBatcher, EnergyTap, SharedEnergyWindow, Switch, level_percent, rms_energy};
pub use sample::AudioSample;

/// Sample rate shared by capture, wire, and playback.
pub const SAMPLE_RATE: u32 = 16_000;

/// Audio is mono end to end.
pub const CHANNELS: usize = 1;

/// Samples per captured block sent as one wire message.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A mono 16 kHz frame of normalized samples.
pub type AudioFrame = frame::AudioBuffer<f32, CHANNELS, SAMPLE_RATE>;
