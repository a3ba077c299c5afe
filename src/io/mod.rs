//! Hardware and network I/O.
//!
//! Concrete collaborators around the capture and playback sessions:
//!
//! - [`WebSocketTransport`] / [`TransportSender`] - duplex PCM over a WebSocket
//! - `MicrophoneInput` / `DeviceOutput` / `DeviceSink` - cpal devices, behind the
//!   `device` feature

#[cfg(feature = "device")]
pub mod audio;
pub mod network;

#[cfg(feature = "device")]
pub use audio::{DeviceOutput, DeviceSink, MicrophoneInput};
pub use network::{TransportEvent, TransportSender, WebSocketTransport};
