use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use duplex_voice::audio::{
    AudioBatcher, AudioFrame, CHANNELS, EnergyTap, PcmEncoder, SAMPLE_RATE, SharedEnergyWindow,
    Switch,
};
use duplex_voice::config::{ClientConfig, TalkMode};
use duplex_voice::io::WebSocketTransport;
use duplex_voice::pipeline::{Pushable, PushableExt};
use duplex_voice::playback::{OutputSink, PlaybackSession};
use duplex_voice::state::EventSender;
use duplex_voice::ui::console;
use duplex_voice::vad::{CaptureSession, PushToTalk};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Voice,
    Ptt,
}

impl From<ModeArg> for TalkMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Voice => TalkMode::VoiceActivated,
            ModeArg::Ptt => TalkMode::PushToTalk,
        }
    }
}

/// Duplex voice client: voice-activated capture, jitter-buffered playback.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML config file; every setting has a default.
    #[arg(short, long, env = "DUPLEX_VOICE_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket server URL, e.g. ws://127.0.0.1:8000/ws/
    #[arg(long)]
    url: Option<String>,

    /// How captured audio is gated.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long)]
    voice_threshold: Option<f64>,

    #[arg(long)]
    silence_threshold: Option<f64>,
}

impl Args {
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(url) = self.url {
            config.transport.url = url;
        }
        if let Some(mode) = self.mode {
            config.vad.mode = mode.into();
        }
        if let Some(threshold) = self.voice_threshold {
            config.vad.voice_threshold = threshold;
        }
        if let Some(threshold) = self.silence_threshold {
            config.vad.silence_threshold = threshold;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    run(config).await
}

async fn run(config: ClientConfig) -> Result<()> {
    info!("Starting duplex voice client for {}", config.transport.url);

    let (events, ui_events) = EventSender::channel();
    let ui = tokio::spawn(console::run(ui_events));
    let shutdown = CancellationToken::new();

    // Network receive -> playback
    let (incoming_tx, incoming_rx) = mpsc::channel(config.playback.max_queued_frames);
    let (transport, transport_sender) =
        WebSocketTransport::new(&config.transport, incoming_tx, events.clone());
    let transport_task = tokio::spawn(transport.run(shutdown.child_token()));

    let (_output, sink) = open_output(&config)?;
    let playback = PlaybackSession::new(&config.playback, sink, events.clone()).spawn(incoming_rx);

    // Microphone -> energy window -> block -> gate -> PCM -> network
    let forwarding = Arc::new(AtomicBool::new(false));
    let window = SharedEnergyWindow::new(config.audio.energy_window);
    let capture_sink: Arc<dyn Pushable<AudioFrame>> = Arc::new(
        transport_sender
            .get_data_from(PcmEncoder::new())
            .get_data_from(Switch::new(forwarding.clone()))
            .get_data_from(AudioBatcher::<f32, CHANNELS, SAMPLE_RATE>::new(
                config.audio.block_size,
            ))
            .get_data_from(EnergyTap::<CHANNELS, SAMPLE_RATE>::new(window.clone())),
    );
    let _microphone = open_microphone(&config, capture_sink, window.clone())?;

    let capture = match config.vad.mode {
        TalkMode::VoiceActivated => {
            Some(CaptureSession::new(&config.vad, forwarding, events.clone()).spawn(window))
        }
        TalkMode::PushToTalk => {
            let ptt = PushToTalk::new(forwarding, events.clone());
            tokio::spawn(push_to_talk(ptt, shutdown.child_token()));
            None
        }
    };
    drop(events);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutting down");
    shutdown.cancel();

    if let Some(capture) = capture {
        capture.stop();
        if let Err(e) = capture.join().await {
            error!("Capture ended with error: {}", e);
        }
    }
    playback.stop();
    if let Err(e) = playback.join().await {
        error!("Playback ended with error: {}", e);
    }
    transport_task.await.context("Transport task panicked")?;
    ui.abort();

    Ok(())
}

/// Toggle talking on every line read from stdin.
async fn push_to_talk(ptt: PushToTalk, cancel: CancellationToken) {
    info!("Push-to-talk: press Enter to start or stop talking");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(_)) => {
                    ptt.toggle();
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            },
        }
    }
    ptt.release();
}

#[cfg(feature = "device")]
fn open_output(
    config: &ClientConfig,
) -> Result<(duplex_voice::io::DeviceOutput, Box<dyn OutputSink>)> {
    let (output, sink) = duplex_voice::io::DeviceOutput::start(
        config.audio.output_device.as_deref(),
    )?;
    Ok((output, Box::new(sink)))
}

#[cfg(not(feature = "device"))]
fn open_output(_config: &ClientConfig) -> Result<((), Box<dyn OutputSink>)> {
    warn!("Built without the `device` feature; received audio is timed but not played");
    Ok(((), Box::new(duplex_voice::playback::ClockSink::new())))
}

#[cfg(feature = "device")]
fn open_microphone(
    config: &ClientConfig,
    sink: Arc<dyn Pushable<AudioFrame>>,
    window: SharedEnergyWindow,
) -> Result<duplex_voice::io::MicrophoneInput> {
    let microphone =
        duplex_voice::io::MicrophoneInput::new(sink, window, config.audio.input_device.clone());
    microphone.enable()?;
    Ok(microphone)
}

#[cfg(not(feature = "device"))]
fn open_microphone(
    _config: &ClientConfig,
    _sink: Arc<dyn Pushable<AudioFrame>>,
    _window: SharedEnergyWindow,
) -> Result<()> {
    warn!("Built without the `device` feature; no microphone is captured");
    Ok(())
}
