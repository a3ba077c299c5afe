//! Terminal status view.
//!
//! Applies [`ClientEvent`]s to a small view model. State changes print
//! immediately; the level meter and playback figures are refreshed once per
//! second.

use std::fmt::Write as _;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::state::{ClientEvent, ConnectionStatus, PlaybackStatus};

const METER_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    connection: ConnectionStatus,
    voice: bool,
    listening: bool,
    level_percent: u32,
    playback: Option<PlaybackStatus>,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Disconnected,
            voice: false,
            listening: false,
            level_percent: 0,
            playback: None,
        }
    }
}

impl ConsoleView {
    /// Fold `event` into the view. Returns a line to print right away, if any.
    pub fn apply(&mut self, event: ClientEvent) -> Option<String> {
        match event {
            ClientEvent::Status(status) => {
                self.playback = Some(status);
                None
            }
            ClientEvent::Energy { level_percent, .. } => {
                self.level_percent = level_percent;
                None
            }
            ClientEvent::VoiceDetected(voice) => {
                self.voice = voice;
                Some(if voice { "Voice detected" } else { "Silence" }.to_string())
            }
            ClientEvent::Listening(listening) => {
                self.listening = listening;
                Some(if listening { "Sending audio" } else { "Not sending" }.to_string())
            }
            ClientEvent::Connection(connection) => {
                self.connection = connection;
                Some(match connection {
                    ConnectionStatus::Connected => "Connected".to_string(),
                    ConnectionStatus::Disconnected => "Disconnected, retrying".to_string(),
                })
            }
            ClientEvent::Fatal(reason) => Some(format!("Error: {reason}")),
        }
    }

    /// One status line: connection, send state, meter and playback figures.
    pub fn status_line(&self) -> String {
        let filled = (self.level_percent as usize * METER_WIDTH) / 100;
        let mut line = format!(
            "[{}] {} [{}{}] {:3}%",
            match self.connection {
                ConnectionStatus::Connected => "online ",
                ConnectionStatus::Disconnected => "offline",
            },
            if self.listening { "TX" } else { "--" },
            "#".repeat(filled),
            " ".repeat(METER_WIDTH - filled),
            self.level_percent,
        );
        if let Some(status) = &self.playback {
            let _ = write!(
                line,
                " | buffer {:.0} ms, latency {:.0} ms, queued {}",
                status.buffer_seconds * 1000.0,
                status.latency_ms,
                status.queue_depth
            );
        }
        line
    }
}

/// Print events until every sender is gone.
pub async fn run(mut events: mpsc::UnboundedReceiver<ClientEvent>) {
    let mut view = ConsoleView::default();
    let mut refresh = interval(Duration::from_secs(1));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(line) = view.apply(event) {
                        println!("{line}");
                    }
                }
                None => break,
            },
            _ = refresh.tick() => println!("{}", view.status_line()),
        }
    }
}
