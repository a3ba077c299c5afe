//! Core pipeline traits.
//!
//! - [`Node`] - A processing unit that transforms input data to output data
//!
//! For push operations and chaining, see [`Pushable`](super::Pushable).

/// A processing node that transforms input to output.
///
/// Nodes run on the capture device's callback thread, so they take `&self` and
/// keep any state behind atomics or locks.
pub trait Node: Send + Sync {
    type Input;
    type Output;

    /// Process input data and optionally produce output.
    ///
    /// Returns `None` if the input is swallowed (gated off, malformed, empty).
    fn process(&self, input: Self::Input) -> Option<Self::Output>;
}
