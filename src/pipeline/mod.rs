pub mod dyn_traits;
pub mod traits;

pub use dyn_traits::{Chained, Pushable, PushableExt};
pub use traits::Node;
