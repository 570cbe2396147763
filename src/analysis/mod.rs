//! Whole-tree graph algorithms shared by the inference and zone engines.
pub mod topology;

pub use topology::{has_used_link_cycle, sort, sort_both_ways, TopologyError, ZoneEdges};
