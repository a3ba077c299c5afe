//! Push-side pipeline traits and chaining.
//!
//! A capture pipeline is built back to front: start from the final destination
//! and prepend nodes with [`PushableExt::get_data_from`].
//!
//! ```ignore
//! let capture_sink = transport_sender
//!     .get_data_from(PcmEncoder::new())
//!     .get_data_from(Switch::new(forwarding.clone()))
//!     .get_data_from(EnergyTap::new(window.clone()));
//! capture_sink.push(block); // EnergyTap -> Switch -> PcmEncoder -> transport
//! ```

use std::sync::Arc;

use super::traits::Node;

/// Passive receiver - can receive pushed data.
pub trait Pushable<T>: Send + Sync {
    fn push(&self, input: T);
}

impl<T, P: Pushable<T> + ?Sized> Pushable<T> for Arc<P> {
    fn push(&self, input: T) {
        (**self).push(input)
    }
}

/// A node whose output is pushed into `next`.
pub struct Chained<N, D> {
    node: N,
    next: D,
}

impl<N, D> Pushable<N::Input> for Chained<N, D>
where
    N: Node,
    D: Pushable<N::Output>,
{
    fn push(&self, input: N::Input) {
        if let Some(output) = self.node.process(input) {
            self.next.push(output);
        }
    }
}

pub trait PushableExt<T>: Pushable<T> + Sized {
    /// Put `node` in front of this sink.
    fn get_data_from<N>(self, node: N) -> Chained<N, Self>
    where
        N: Node<Output = T>,
    {
        Chained { node, next: self }
    }
}

impl<T, P: Pushable<T>> PushableExt<T> for P {}
