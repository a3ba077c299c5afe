use std::sync::Arc;

use crate::error::CodecError;

/// A type-safe, immutable audio buffer with compile-time channel count and sample rate.
///
/// The sample storage is reference counted so a frame can be cloned cheaply when it
/// is fanned out (for instance to a level meter and to the network encoder) without
/// ever being mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    data: Arc<[Sample]>,
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32>
    AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>
{
    /// Create a new audio buffer from raw interleaved samples.
    ///
    /// Returns an error if the data length is not a multiple of the channel count.
    pub fn new(data: Vec<Sample>) -> Result<Self, CodecError> {
        if !data.is_empty() && data.len() % CHANNELS != 0 {
            return Err(CodecError::ChannelMismatch {
                len: data.len(),
                channels: CHANNELS,
            });
        }
        Ok(Self { data: data.into() })
    }

    /// Returns the number of samples per channel.
    pub fn samples_per_channel(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// Playback length of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples_per_channel() as f64 / SAMPLE_RATE as f64
    }

    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
