//! Anonymous attribute and zone inference for geometry node trees.
//!
//! A [`NodeTree`] holds nodes, sockets and links in columnar storage. Two
//! analyses run on it lazily and are cached until the topology changes:
//!
//! - [`NodeTree::anonymous_attribute_inferencing`] tracks which fields and
//!   geometries reach every socket and which anonymous attributes must be
//!   kept alive on which geometry, and summarizes the tree as
//!   [`RelationsInNode`] for group nodes that embed it.
//! - [`NodeTree::zones`] finds the nested regions delimited by paired
//!   simulation input/output markers.

pub mod analysis;
pub mod bits;
pub mod graph;
pub mod inference;
pub mod relations;
pub mod store;
pub mod zones;

pub mod display {
    pub mod trace;

    pub use trace::{format_inference_trace, format_zone_tree};
}

pub use graph::{NodeTree, RelationsUpdate};
pub use inference::InferenceResult;
pub use relations::RelationsInNode;
pub use store::{load_library, load_library_from_path, Library, TreeError};
pub use zones::{Zone, ZoneForest};
