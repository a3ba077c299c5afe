//! Capture gate: decides when captured audio is sent to the peer.
//!
//! - [`gate`] - the two-threshold voice activity state machine
//! - [`session`] - the timer-driven polling loop, plus push-to-talk

pub mod gate;
pub mod session;

pub use gate::{CaptureGate, VadState, VadTransition};
pub use session::{CaptureHandle, CaptureSession, PushToTalk};

use crate::error::CaptureError;

/// Where the capture gate reads microphone energy from.
pub trait EnergySource {
    /// RMS energy of the most recent capture window.
    ///
    /// `Ok(None)` means no usable window this cycle (a transient hiccup, retried
    /// next cycle). `Err` means the device is gone and the session must stop.
    fn current_energy(&mut self) -> Result<Option<f64>, CaptureError>;
}
