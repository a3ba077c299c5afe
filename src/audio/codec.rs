//! Wire PCM encoding and decoding.
//!
//! Converts between [`AudioFrame`] (normalized `f32`) and the wire payload:
//! mono, 16-bit signed, little-endian PCM.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::audio::AudioSample;
use crate::audio::frame::AudioBuffer;
use crate::audio::AudioFrame;
use crate::error::CodecError;
use crate::pipeline::Node;

const BYTES_PER_SAMPLE: usize = 2;

/// Decode a little-endian 16-bit PCM payload into a normalized frame.
pub fn decode(bytes: &[u8]) -> Result<AudioFrame, CodecError> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(CodecError::OddLength(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).to_f64_normalized() as f32)
        .collect();
    AudioBuffer::new(samples)
}

/// Encode normalized samples as little-endian 16-bit PCM.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        out.extend_from_slice(&i16::from_f64_normalized(sample as f64).to_le_bytes());
    }
    out
}

/// Pipeline node turning captured frames into wire payloads.
pub struct PcmEncoder {
    encoded_frames: AtomicU64,
}

impl PcmEncoder {
    pub fn new() -> Self {
        Self {
            encoded_frames: AtomicU64::new(0),
        }
    }

    pub fn encoded_frames(&self) -> u64 {
        self.encoded_frames.load(Ordering::Relaxed)
    }
}

impl Default for PcmEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for PcmEncoder {
    type Input = AudioFrame;
    type Output = Vec<u8>;

    fn process(&self, input: Self::Input) -> Option<Self::Output> {
        if input.is_empty() {
            return None;
        }
        self.encoded_frames.fetch_add(1, Ordering::Relaxed);
        Some(encode(input.data()))
    }
}

/// Pipeline node turning received wire payloads into frames.
///
/// Malformed payloads are dropped with a warning; empty payloads are dropped silently.
pub struct PcmDecoder;

impl Node for PcmDecoder {
    type Input = Vec<u8>;
    type Output = AudioFrame;

    fn process(&self, input: Self::Input) -> Option<Self::Output> {
        if input.is_empty() {
            return None;
        }
        match decode(&input) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Dropping malformed audio payload: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_little_endian() {
        let bytes = [0x00, 0x80, 0x00, 0x00, 0x00, 0x40];
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.data(), &[-1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode(&[0x01, 0x02, 0x03]), Err(CodecError::OddLength(3)));
    }

    #[test]
    fn test_encode_scales_and_clamps() {
        let bytes = encode(&[1.0, -1.0, 0.0, 4.0]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(values, vec![32767, -32767, 0, 32767]);
    }

    #[test]
    fn test_encoder_node_skips_empty_frames() {
        let encoder = PcmEncoder::new();
        assert!(encoder.process(AudioFrame::new(Vec::new()).unwrap()).is_none());

        let out = encoder.process(AudioFrame::new(vec![0.5; 4]).unwrap()).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(encoder.encoded_frames(), 1);
    }

    #[test]
    fn test_decoder_node_drops_malformed() {
        assert!(PcmDecoder.process(vec![1, 2, 3]).is_none());
        assert!(PcmDecoder.process(Vec::new()).is_none());
        let frame = PcmDecoder.process(vec![0, 0, 0, 0]).unwrap();
        assert_eq!(frame.samples_per_channel(), 2);
    }
}
