//! Zones: regions of a tree delimited by a paired input and output marker node.
//! Zones nest; every node belongs to at most one innermost zone.

mod discovery;
mod forest;

pub use discovery::discover_zones;
pub use forest::{Zone, ZoneForest};
