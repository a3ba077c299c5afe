//! Regroups device-sized callbacks into fixed-size wire blocks.

use std::sync::Mutex;

use crate::audio::AudioSample;
use crate::audio::frame::AudioBuffer;
use crate::pipeline::Node;

/// Accumulates incoming samples and emits one block every `block_size` samples.
pub struct AudioBatcher<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    buffer: Mutex<Vec<Sample>>,
    block_size: usize,
}

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32>
    AudioBatcher<Sample, CHANNELS, SAMPLE_RATE>
{
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(CHANNELS);
        Self {
            buffer: Mutex::new(Vec::with_capacity(block_size * 2)),
            block_size,
        }
    }
}

impl<Sample: AudioSample, const CHANNELS: usize, const SAMPLE_RATE: u32> Node
    for AudioBatcher<Sample, CHANNELS, SAMPLE_RATE>
{
    type Input = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;
    type Output = AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>;

    fn process(&self, input: Self::Input) -> Option<Self::Output> {
        let mut buffer = self.buffer.lock().ok()?;
        buffer.extend_from_slice(input.data());

        if buffer.len() >= self.block_size {
            let samples: Vec<Sample> = buffer.drain(..self.block_size).collect();
            AudioBuffer::new(samples).ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;

    #[test]
    fn test_emits_full_blocks_only() {
        let batcher = AudioBatcher::<f32, 1, 16_000>::new(4);
        let chunk = || AudioFrame::new(vec![0.1; 3]).unwrap();

        assert!(batcher.process(chunk()).is_none());
        let block = batcher.process(chunk()).unwrap();
        assert_eq!(block.samples_per_channel(), 4);

        // Two samples carried over, one more chunk completes the next block.
        assert!(batcher.process(chunk()).is_some());
    }
}
