//! Audio device I/O using cpal.
//!
//! Provides:
//! - [`MicrophoneInput`] for microphone capture into the capture pipeline
//! - [`DeviceOutput`] / [`DeviceSink`] for speaker playback, with the sink
//!   keeping time by counting the samples the device has consumed

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::audio::effects::SharedEnergyWindow;
use crate::audio::{AudioFrame, AudioSample, CHANNELS, SAMPLE_RATE};
use crate::error::SinkError;
use crate::pipeline::Pushable;
use crate::playback::{Completion, OutputSink};

/// Ring capacity between the scheduler and the output callback.
const OUTPUT_RING_SECONDS: usize = 4;

/// How often a completion waiter re-checks the played-sample counter.
const COMPLETION_POLL: Duration = Duration::from_millis(5);

fn find_device_by_name<I: Iterator<Item = Device>>(mut devices: I, name: &str) -> Option<Device> {
    devices.find(|d| d.name().is_ok_and(|n| n == name))
}

fn get_input_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => {
            let devices = host
                .input_devices()
                .context("Failed to enumerate input devices")?;
            find_device_by_name(devices, name)
                .with_context(|| format!("Input device {name:?} not found"))
        }
        None => host
            .default_input_device()
            .context("No default input device available"),
    }
}

fn get_output_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => {
            let devices = host
                .output_devices()
                .context("Failed to enumerate output devices")?;
            find_device_by_name(devices, name)
                .with_context(|| format!("Output device {name:?} not found"))
        }
        None => host
            .default_output_device()
            .context("No default output device available"),
    }
}

fn stream_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Default,
    }
}

/// Captures the microphone at 16 kHz mono.
///
/// Every device callback is pushed into `sink` as one frame. If the device
/// disappears the energy window is marked unavailable, which stops the
/// capture session on its next cycle.
pub struct MicrophoneInput {
    sink: Arc<dyn Pushable<AudioFrame>>,
    window: SharedEnergyWindow,
    device_name: Option<String>,
    stream: Mutex<Option<cpal::Stream>>,
}

impl MicrophoneInput {
    pub fn new(
        sink: Arc<dyn Pushable<AudioFrame>>,
        window: SharedEnergyWindow,
        device_name: Option<String>,
    ) -> Self {
        Self {
            sink,
            window,
            device_name,
            stream: Mutex::new(None),
        }
    }

    pub fn enable(&self) -> Result<()> {
        let mut stream_guard = self
            .stream
            .lock()
            .map_err(|_| anyhow::anyhow!("Microphone state poisoned"))?;
        if stream_guard.is_some() {
            return Ok(());
        }

        let device = get_input_device(self.device_name.as_deref())?;
        debug!("Input config: {:#?}", device.default_input_config());

        let sink = self.sink.clone();
        let window = self.window.clone();
        let stream = device
            .build_input_stream(
                &stream_config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(frame) = AudioFrame::new(data.to_vec()) {
                        sink.push(frame);
                    }
                },
                move |err| {
                    error!("An error occurred on the input audio stream: {}", err);
                    if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                        window.mark_unavailable(err.to_string());
                    }
                },
                None,
            )
            .context("Failed to open microphone at 16 kHz mono")?;
        stream.play().context("Failed to start microphone")?;
        info!("Microphone input enabled");
        *stream_guard = Some(stream);
        Ok(())
    }
}

/// Keeps the output stream alive. Dropping it stops playback.
pub struct DeviceOutput {
    _stream: cpal::Stream,
}

impl DeviceOutput {
    /// Open the output device and return the stream guard plus the sink that
    /// schedules frames onto it.
    pub fn start(device_name: Option<&str>) -> Result<(Self, DeviceSink)> {
        let device = get_output_device(device_name)?;
        debug!("Output config: {:#?}", device.default_output_config());

        let capacity = SAMPLE_RATE as usize * CHANNELS * OUTPUT_RING_SECONDS;
        let (producer, mut consumer) = rtrb::RingBuffer::<f32>::new(capacity);
        let played = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicBool::new(false));

        let played_in_callback = played.clone();
        let failed_in_callback = failed.clone();
        let stream = device
            .build_output_stream(
                &stream_config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = consumer.pop().unwrap_or_else(|_| f32::silence());
                    }
                    played_in_callback.fetch_add(data.len() as u64, Ordering::Release);
                },
                move |err| {
                    error!("An error occurred on the output audio stream: {}", err);
                    if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                        failed_in_callback.store(true, Ordering::Release);
                    }
                },
                None,
            )
            .context("Failed to open output device at 16 kHz mono")?;
        stream.play().context("Failed to start output stream")?;
        info!("Audio output started");

        let sink = DeviceSink {
            producer,
            played,
            failed,
            timeline_end: 0,
        };
        Ok((Self { _stream: stream }, sink))
    }
}

/// [`OutputSink`] writing into the output stream's ring buffer.
///
/// The clock is the number of samples the device has consumed. Gaps between
/// scheduled frames are padded with silence.
pub struct DeviceSink {
    producer: rtrb::Producer<f32>,
    played: Arc<AtomicU64>,
    failed: Arc<AtomicBool>,
    /// Clock position right after the last sample written.
    timeline_end: u64,
}

impl DeviceSink {
    fn played(&self) -> u64 {
        self.played.load(Ordering::Acquire)
    }
}

impl OutputSink for DeviceSink {
    fn now(&self) -> f64 {
        self.played() as f64 / SAMPLE_RATE as f64
    }

    fn schedule(&mut self, frame: AudioFrame, start: f64) -> Result<Completion, SinkError> {
        if self.failed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        // After an underrun everything written has played; restart from the clock.
        let cursor = self.timeline_end.max(self.played());
        let start_sample = (start.max(0.0) * SAMPLE_RATE as f64) as u64;
        let padding = start_sample.saturating_sub(cursor) as usize;
        let needed = padding + frame.data().len();

        if self.producer.slots() < needed {
            warn!(
                "Output ring has {} free slots, frame needs {}",
                self.producer.slots(),
                needed
            );
            return Err(SinkError::Rejected("output buffer full".to_string()));
        }
        let samples = std::iter::repeat_n(f32::silence(), padding).chain(frame.data().iter().copied());
        for sample in samples {
            // Capacity was checked above.
            let _ = self.producer.push(sample);
        }
        self.timeline_end = cursor + needed as u64;

        let end = self.timeline_end;
        let played = self.played.clone();
        let failed = self.failed.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            loop {
                if failed.load(Ordering::Acquire) {
                    // Dropping the sender reports the device as closed.
                    return;
                }
                let now = played.load(Ordering::Acquire);
                if now >= end {
                    let _ = tx.send(());
                    return;
                }
                let remaining = Duration::from_secs_f64((end - now) as f64 / SAMPLE_RATE as f64);
                tokio::time::sleep(remaining.clamp(COMPLETION_POLL, Duration::from_secs(1))).await;
            }
        });
        Ok(rx)
    }
}
