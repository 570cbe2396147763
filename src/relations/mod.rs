//! Anonymous attribute relations between the sockets of a single node.
//!
//! All indices are node-local: an input index counts the node's inputs, an
//! output index counts its outputs. For a whole tree the same structure is
//! used with interface input/output positions, which is what a group node
//! embedding the tree exposes.

use serde::{Deserialize, Serialize};

mod lookup;

pub use lookup::relations_for_node;

/// The field at an input is also referenced by a field output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceRelation {
    pub from_field_input: usize,
    pub to_field_output: usize,
}

/// The geometry at an input is passed on to a geometry output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropagateRelation {
    pub from_geometry_input: usize,
    pub to_geometry_output: usize,
}

/// The field input is evaluated on the geometry input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvalRelation {
    pub field_input: usize,
    pub geometry_input: usize,
}

/// The field output can be evaluated on the geometry output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailableRelation {
    pub field_output: usize,
    pub geometry_output: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationsInNode {
    #[serde(default)]
    pub reference_relations: Vec<ReferenceRelation>,
    #[serde(default)]
    pub propagate_relations: Vec<PropagateRelation>,
    #[serde(default)]
    pub eval_relations: Vec<EvalRelation>,
    #[serde(default)]
    pub available_relations: Vec<AvailableRelation>,
}

impl RelationsInNode {
    pub fn is_empty(&self) -> bool {
        self.reference_relations.is_empty()
            && self.propagate_relations.is_empty()
            && self.eval_relations.is_empty()
            && self.available_relations.is_empty()
    }
}
