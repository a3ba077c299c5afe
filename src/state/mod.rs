//! Client status reported to the UI.
//!
//! The core never waits on the UI. Every state change is sent as a
//! [`ClientEvent`] over an unbounded channel and dropped if nobody listens.

use tokio::sync::mpsc;

/// Transport connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
}

/// Periodic playback figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    /// Current adaptive buffer target, in seconds.
    pub buffer_seconds: f64,
    /// Audio already scheduled ahead of the output clock, in milliseconds.
    pub latency_ms: f64,
    pub queue_depth: usize,
    /// A frame is handed to the sink and its completion is awaited.
    pub playing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Status(PlaybackStatus),
    VoiceDetected(bool),
    /// Captured audio is (or stops being) forwarded to the network.
    Listening(bool),
    Energy { energy: f64, level_percent: u32 },
    Connection(ConnectionStatus),
    /// A session stopped because one of its devices died.
    Fatal(String),
}

/// Fire-and-forget sender for [`ClientEvent`]s.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Create a connected sender/receiver pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A sender that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ClientEvent) {
        if let Some(tx) = &self.tx {
            // The UI may have gone away; the core keeps running regardless.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (events, rx) = EventSender::channel();
        drop(rx);
        events.emit(ClientEvent::VoiceDetected(true));
        EventSender::disabled().emit(ClientEvent::Listening(false));
    }

    #[test]
    fn test_emit_delivers_in_order() {
        let (events, mut rx) = EventSender::channel();
        events.emit(ClientEvent::Listening(true));
        events.emit(ClientEvent::Connection(ConnectionStatus::Connected));

        assert_eq!(rx.try_recv().unwrap(), ClientEvent::Listening(true));
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::Connection(ConnectionStatus::Connected)
        );
    }
}
