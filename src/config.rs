//! Client configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) yields a
//! working client. The binary layers command-line overrides on top.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::audio::DEFAULT_BLOCK_SIZE;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TalkMode {
    /// Forward audio while the capture gate detects voice.
    #[default]
    VoiceActivated,
    /// Forward audio while the user holds the talk control.
    PushToTalk,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per captured block (one wire message).
    pub block_size: usize,
    /// Samples in the window the capture gate measures.
    pub energy_window: usize,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            energy_window: 128,
            input_device: None,
            output_device: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub mode: TalkMode,
    pub update_interval_ms: u64,
    pub voice_threshold: f64,
    pub silence_threshold: f64,
    pub silence_timeout_ms: u64,
}

impl VadConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            mode: TalkMode::VoiceActivated,
            update_interval_ms: 50,
            voice_threshold: 0.05,
            silence_threshold: 0.01,
            silence_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub initial_buffer_seconds: f64,
    pub min_buffer_seconds: f64,
    pub max_buffer_seconds: f64,
    pub settle_delay_ms: u64,
    /// Frames held before the oldest is dropped.
    pub max_queued_frames: usize,
    /// Delay the first frame of a burst by the current buffer target.
    pub prebuffer_on_restart: bool,
}

impl PlaybackConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_buffer_seconds: 0.1,
            min_buffer_seconds: 0.05,
            max_buffer_seconds: 0.3,
            settle_delay_ms: 5,
            max_queued_frames: 64,
            prebuffer_on_restart: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub url: String,
    pub reconnect_delay_ms: u64,
    /// Outgoing wire messages buffered before new ones are dropped.
    pub send_queue: usize,
}

impl TransportConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws/".to_string(),
            reconnect_delay_ms: 2000,
            send_queue: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub playback: PlaybackConfig,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let vad = &self.vad;
        if !(vad.silence_threshold >= 0.0 && vad.silence_threshold < vad.voice_threshold) {
            return invalid(format!(
                "silence_threshold {} must be non-negative and below voice_threshold {}",
                vad.silence_threshold, vad.voice_threshold
            ));
        }
        if vad.update_interval_ms == 0 {
            return invalid("update_interval_ms must be positive".to_string());
        }

        let playback = &self.playback;
        if !(playback.min_buffer_seconds > 0.0
            && playback.min_buffer_seconds <= playback.max_buffer_seconds)
        {
            return invalid(format!(
                "buffer bounds [{}, {}] are not a positive range",
                playback.min_buffer_seconds, playback.max_buffer_seconds
            ));
        }
        if playback.max_queued_frames == 0 {
            return invalid("max_queued_frames must be positive".to_string());
        }

        if self.audio.block_size == 0 || self.audio.energy_window == 0 {
            return invalid("block_size and energy_window must be positive".to_string());
        }
        if self.transport.send_queue == 0 {
            return invalid("send_queue must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.vad.update_interval(), Duration::from_millis(50));
        assert_eq!(config.vad.silence_timeout(), Duration::from_secs(1));
        assert_eq!(config.playback.settle_delay(), Duration::from_millis(5));
        assert_eq!(config.audio.block_size, 4096);
        assert_eq!(config.audio.energy_window, 128);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(ClientConfig::from_toml("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ClientConfig::from_toml(
            r#"
            [vad]
            mode = "push-to-talk"
            voice_threshold = 0.08

            [playback]
            prebuffer_on_restart = true
            "#,
        )
        .unwrap();

        assert_eq!(config.vad.mode, TalkMode::PushToTalk);
        assert_eq!(config.vad.voice_threshold, 0.08);
        assert_eq!(config.vad.silence_threshold, 0.01);
        assert!(config.playback.prebuffer_on_restart);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = ClientConfig::from_toml("[vad]\nsilence_threshold = 0.2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_inverted_buffer_bounds() {
        let mut config = ClientConfig::default();
        config.playback.min_buffer_seconds = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unparseable_toml() {
        assert!(matches!(
            ClientConfig::from_toml("[vad\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
