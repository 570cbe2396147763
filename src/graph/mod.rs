//! The node tree and the analysis caches attached to it.
pub mod dag;
pub mod runtime;

pub use dag::{NodeTree, RelationsUpdate};
pub use runtime::{CacheMutex, Refresh, TreeRuntime};
