//! Duplex audio transport over a WebSocket.
//!
//! - [`TransportSender`] - pipeline end that queues encoded frames for sending
//! - [`WebSocketTransport`] - connection loop: connects, pumps frames both ways,
//!   and reconnects after a fixed delay when the connection drops
//!
//! # Protocol
//!
//! Every binary message carries one block of mono 16-bit little-endian PCM at
//! 16 kHz. Other message types are ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::TransportConfig;
use crate::pipeline::Pushable;
use crate::state::{ClientEvent, ConnectionStatus, EventSender};

/// What the transport hands to the playback side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(Vec<u8>),
    Connected,
    Disconnected,
}

/// Queues outgoing wire payloads for the connection loop.
///
/// Payloads pushed while disconnected, or while the send queue is full, are
/// dropped and counted.
#[derive(Clone)]
pub struct TransportSender {
    tx: mpsc::Sender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl TransportSender {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn dropped_payloads(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Pushable<Vec<u8>> for TransportSender {
    fn push(&self, payload: Vec<u8>) {
        if !self.is_connected() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Not connected, dropping {} byte payload", payload.len());
            return;
        }
        match self.tx.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(payload)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Send queue full, dropping {} byte payload", payload.len());
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Transport stopped, dropping payload");
            }
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    url: String,
    reconnect_delay: Duration,
    incoming: mpsc::Sender<TransportEvent>,
    outgoing: mpsc::Receiver<Vec<u8>>,
    connected: Arc<AtomicBool>,
    events: EventSender,
}

impl WebSocketTransport {
    /// Build the transport and the sender that feeds it.
    ///
    /// Received frames and connection changes are delivered on `incoming`.
    pub fn new(
        config: &TransportConfig,
        incoming: mpsc::Sender<TransportEvent>,
        events: EventSender,
    ) -> (Self, TransportSender) {
        let (tx, outgoing) = mpsc::channel(config.send_queue.max(1));
        let connected = Arc::new(AtomicBool::new(false));

        let transport = Self {
            url: config.url.clone(),
            reconnect_delay: config.reconnect_delay(),
            incoming,
            outgoing,
            connected: connected.clone(),
            events,
        };
        let sender = TransportSender {
            tx,
            connected,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (transport, sender)
    }

    /// Connect and keep reconnecting until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            info!("Connecting to {}", self.url);
            let connecting = tokio::select! {
                _ = cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match connecting {
                Ok((socket, _response)) => {
                    let served = self.serve(socket, &cancel).await;
                    if let Err(e) = served {
                        warn!("Connection to {} lost: {:#}", self.url, e);
                    }
                }
                Err(e) => warn!("Failed to connect to {}: {}", self.url, e),
            }

            debug!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.reconnect_delay) => {}
            }
        }
        info!("Transport stopped");
    }

    async fn serve(&mut self, socket: Socket, cancel: &CancellationToken) -> Result<()> {
        // Anything queued before this connection is stale.
        while self.outgoing.try_recv().is_ok() {}
        self.set_connected(true).await;

        let (mut write, mut read) = socket.split();
        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break Ok(());
                }
                payload = self.outgoing.recv() => {
                    let Some(payload) = payload else {
                        break Ok(());
                    };
                    if let Err(e) = write.send(Message::Binary(payload)).await {
                        break Err(e).context("Failed to send audio frame");
                    }
                }
                message = read.next() => match message {
                    Some(Ok(Message::Binary(data))) => {
                        // Playback may have stopped; the send path keeps running.
                        let len = data.len();
                        if self.incoming.send(TransportEvent::Frame(data)).await.is_err() {
                            trace!("Playback gone, discarding {} byte frame", len);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Server closed the connection: {:?}", frame);
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e).context("Failed to receive from server"),
                    None => break Ok(()),
                },
            }
        };

        self.set_connected(false).await;
        result
    }

    async fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        let (status, event) = if connected {
            info!("Connected to {}", self.url);
            (ConnectionStatus::Connected, TransportEvent::Connected)
        } else {
            info!("Disconnected from {}", self.url);
            (ConnectionStatus::Disconnected, TransportEvent::Disconnected)
        };
        self.events.emit(ClientEvent::Connection(status));
        let _ = self.incoming.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn config(url: String) -> TransportConfig {
        TransportConfig {
            url,
            reconnect_delay_ms: 50,
            send_queue: 4,
        }
    }

    #[test]
    fn test_sender_drops_while_disconnected() {
        let (incoming, _rx) = mpsc::channel(4);
        let (_transport, sender) = WebSocketTransport::new(
            &config("ws://127.0.0.1:1/ws/".to_string()),
            incoming,
            EventSender::disabled(),
        );

        sender.push(vec![0, 0]);
        assert!(!sender.is_connected());
        assert_eq!(sender.dropped_payloads(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_through_echo_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if message.is_binary() {
                    ws.send(message).await.unwrap();
                }
            }
        });

        let (incoming, mut rx) = mpsc::channel(8);
        let (events, mut ui) = EventSender::channel();
        let (transport, sender) =
            WebSocketTransport::new(&config(format!("ws://{addr}/ws/")), incoming, events);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(transport.run(cancel.clone()));

        assert_eq!(rx.recv().await, Some(TransportEvent::Connected));
        assert!(sender.is_connected());

        sender.push(vec![1, 0, 2, 0]);
        assert_eq!(rx.recv().await, Some(TransportEvent::Frame(vec![1, 0, 2, 0])));

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(rx.recv().await, Some(TransportEvent::Disconnected));
        assert!(!sender.is_connected());

        assert_eq!(
            ui.try_recv().unwrap(),
            ClientEvent::Connection(ConnectionStatus::Connected)
        );
        assert_eq!(
            ui.try_recv().unwrap(),
            ClientEvent::Connection(ConnectionStatus::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_sending_continues_after_playback_stops() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, mut received) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Binary(vec![9, 9])).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Binary(data) = message {
                    let _ = received_tx.send(data);
                }
            }
        });

        let (incoming, rx) = mpsc::channel(8);
        drop(rx);
        let (transport, sender) = WebSocketTransport::new(
            &config(format!("ws://{addr}/ws/")),
            incoming,
            EventSender::disabled(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(transport.run(cancel.clone()));

        while !sender.is_connected() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Give the server frame time to arrive and be discarded.
        tokio::time::sleep(Duration::from_millis(50)).await;

        sender.push(vec![1, 0, 2, 0]);
        assert_eq!(received.recv().await, Some(vec![1, 0, 2, 0]));
        assert!(!task.is_finished());
        assert!(sender.is_connected());
        assert_eq!(sender.dropped_payloads(), 0);

        cancel.cancel();
        task.await.unwrap();
        assert!(!sender.is_connected());
    }
}
