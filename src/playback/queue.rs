use std::collections::VecDeque;

use tracing::warn;

use crate::audio::AudioFrame;

/// FIFO of frames waiting to be scheduled.
///
/// Frames leave in arrival order. When full, the oldest frame is dropped to
/// make room so playback stays close to real time.
pub struct JitterQueue {
    frames: VecDeque<AudioFrame>,
    capacity: usize,
    dropped_frames: u64,
}

impl std::fmt::Debug for JitterQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitterQueue")
            .field("len", &self.frames.len())
            .field("capacity", &self.capacity)
            .field("dropped_frames", &self.dropped_frames)
            .finish()
    }
}

impl JitterQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            dropped_frames: 0,
        }
    }

    /// Append `frame`, returning the frame evicted to make room, if any.
    pub fn push(&mut self, frame: AudioFrame) -> Option<AudioFrame> {
        let dropped = if self.frames.len() >= self.capacity {
            self.dropped_frames += 1;
            warn!(
                "Jitter queue full ({} frames), dropping oldest ({} dropped so far)",
                self.capacity, self.dropped_frames
            );
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        dropped
    }

    pub fn pop(&mut self) -> Option<AudioFrame> {
        self.frames.pop_front()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(marker: f32) -> AudioFrame {
        AudioFrame::new(vec![marker; 4]).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = JitterQueue::new(8);
        for i in 0..5 {
            assert!(queue.push(frame(i as f32 / 10.0)).is_none());
        }

        let order: Vec<f32> = std::iter::from_fn(|| queue.pop())
            .map(|f| f.data()[0])
            .collect();
        assert_eq!(order, vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut queue = JitterQueue::new(2);
        queue.push(frame(0.1));
        queue.push(frame(0.2));

        let dropped = queue.push(frame(0.3)).unwrap();
        assert_eq!(dropped.data()[0], 0.1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_frames(), 1);
        assert_eq!(queue.pop().unwrap().data()[0], 0.2);
    }
}
