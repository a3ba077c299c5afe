//! Audio level metering.
//!
//! [`EnergyTap`] sits at the head of the capture pipeline and copies every
//! captured block into a shared [`EnergyWindow`]. The capture gate reads the RMS
//! of that window on its own cadence through [`EnergySource`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::audio::AudioSample;
use crate::audio::frame::AudioBuffer;
use crate::error::CaptureError;
use crate::pipeline::Node;
use crate::vad::EnergySource;

/// Root-mean-square of a sample window. Empty windows have zero energy.
pub fn rms_energy<Sample: AudioSample>(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|s| {
            let v = s.to_f64_normalized();
            v * v
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Map an RMS energy onto a 0-100 meter. Speech rarely exceeds 0.2 RMS, so the
/// meter saturates there.
pub fn level_percent(energy: f64) -> u32 {
    (energy * 500.0).clamp(0.0, 100.0) as u32
}

/// The most recent `window_size` captured samples.
#[derive(Debug)]
pub struct EnergyWindow {
    window: VecDeque<f32>,
    window_size: usize,
    fresh: bool,
    unavailable: Option<String>,
}

impl EnergyWindow {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            fresh: false,
            unavailable: None,
        }
    }

    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.window.len() == self.window_size {
                self.window.pop_front();
            }
            self.window.push_back(sample);
        }
        if !samples.is_empty() {
            self.fresh = true;
        }
    }

    /// Mark the device behind this window as gone. Every later read fails.
    pub fn mark_unavailable(&mut self, reason: impl Into<String>) {
        self.unavailable = Some(reason.into());
    }

    /// RMS of the current window.
    ///
    /// Returns `Ok(None)` when no new samples arrived since the last read or the
    /// window holds garbage; the caller skips that cycle.
    pub fn energy(&mut self) -> Result<Option<f64>, CaptureError> {
        if let Some(reason) = &self.unavailable {
            return Err(CaptureError::DeviceUnavailable(reason.clone()));
        }
        if !self.fresh || self.window.len() < self.window_size {
            return Ok(None);
        }
        self.fresh = false;

        let rms = rms_energy(self.window.make_contiguous());
        Ok(rms.is_finite().then_some(rms))
    }
}

/// Handle shared between the capture callback and the capture gate.
#[derive(Debug, Clone)]
pub struct SharedEnergyWindow(Arc<Mutex<EnergyWindow>>);

impl SharedEnergyWindow {
    pub fn new(window_size: usize) -> Self {
        Self(Arc::new(Mutex::new(EnergyWindow::new(window_size))))
    }

    pub fn push_samples(&self, samples: &[f32]) {
        if let Ok(mut window) = self.0.lock() {
            window.push_samples(samples);
        }
    }

    pub fn mark_unavailable(&self, reason: impl Into<String>) {
        if let Ok(mut window) = self.0.lock() {
            window.mark_unavailable(reason);
        }
    }
}

impl EnergySource for SharedEnergyWindow {
    fn current_energy(&mut self) -> Result<Option<f64>, CaptureError> {
        match self.0.lock() {
            Ok(mut window) => window.energy(),
            Err(_) => Err(CaptureError::DeviceUnavailable(
                "energy window poisoned".to_string(),
            )),
        }
    }
}

/// Pass-through node that feeds every block into a [`SharedEnergyWindow`].
pub struct EnergyTap<const CHANNELS: usize, const SAMPLE_RATE: u32> {
    window: SharedEnergyWindow,
}

impl<const CHANNELS: usize, const SAMPLE_RATE: u32> EnergyTap<CHANNELS, SAMPLE_RATE> {
    pub fn new(window: SharedEnergyWindow) -> Self {
        Self { window }
    }
}

impl<const CHANNELS: usize, const SAMPLE_RATE: u32> Node for EnergyTap<CHANNELS, SAMPLE_RATE> {
    type Input = AudioBuffer<f32, CHANNELS, SAMPLE_RATE>;
    type Output = AudioBuffer<f32, CHANNELS, SAMPLE_RATE>;

    fn process(&self, input: Self::Input) -> Option<Self::Output> {
        self.window.push_samples(input.data());
        Some(input)
    }
}
