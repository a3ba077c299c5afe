//! Switch node for conditionally forwarding data.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

use crate::pipeline::Node;

/// Passes data through while the shared flag is set and swallows it otherwise.
/// When closed, downstream gets no data at all, not even silence.
///
/// The capture gate and push-to-talk both drive the same flag, so this node is
/// the only place where captured audio is actually held back.
pub struct Switch<T> {
    enabled: Arc<AtomicBool>,
    blocked: AtomicU64,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Switch<T> {
    pub fn new(enabled: Arc<AtomicBool>) -> Self {
        Self {
            enabled,
            blocked: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    /// Number of items swallowed while the switch was open.
    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }
}

impl<T> Node for Switch<T> {
    type Input = T;
    type Output = T;

    fn process(&self, input: Self::Input) -> Option<Self::Output> {
        if self.enabled.load(Ordering::Acquire) {
            Some(input)
        } else {
            let blocked = self.blocked.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("Switch closed, {} blocks held back", blocked);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_follows_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let switch = Switch::<u32>::new(flag.clone());

        assert_eq!(switch.process(1), None);
        flag.store(true, Ordering::Release);
        assert_eq!(switch.process(2), Some(2));
        flag.store(false, Ordering::Release);
        assert_eq!(switch.process(3), None);
        assert_eq!(switch.blocked(), 2);
    }
}
