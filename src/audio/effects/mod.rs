//! Capture-side pipeline nodes.
//!
//! - [`batcher`] - Regroups device callbacks into wire-sized blocks
//! - [`level_meter`] - RMS energy, meter scaling, and the shared energy window
//! - [`switch`] - Forwarding gate driven by an `AtomicBool`

pub mod batcher;
pub mod level_meter;
pub mod switch;

pub use batcher::AudioBatcher;
pub use level_meter::{EnergyTap, EnergyWindow, SharedEnergyWindow, level_percent, rms_energy};
pub use switch::Switch;
