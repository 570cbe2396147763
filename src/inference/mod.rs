//! Anonymous attribute inferencing.
//!
//! Figures out which anonymous attributes (fields produced inside a tree and
//! stored on geometries) may reach which sockets, and which of them have to
//! be kept alive on a given geometry socket because something downstream
//! still evaluates them. The tree-level summary is what a group node
//! embedding the tree uses as its own relations.

mod engine;
mod sources;

pub use engine::infer;
pub use sources::{FieldSource, GeometrySource, SourceOrigin};

use crate::bits::BitGroupVector;
use crate::relations::RelationsInNode;
use crate::store::SocketId;

/// Everything the inference produced for one tree.
///
/// The bit relations have one group per socket of the tree (indexed by
/// [`SocketId::index`]). Field bits index into `field_sources`, geometry bits
/// into `geometry_sources`, and propagate-to-output bits into
/// `propagated_output_geometry_indices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub field_sources: Vec<FieldSource>,
    pub geometry_sources: Vec<GeometrySource>,
    pub propagated_fields_by_socket: BitGroupVector,
    pub propagated_geometries_by_socket: BitGroupVector,
    /// Fields that may be evaluated on the geometry at a socket.
    pub available_fields_by_geometry_socket: BitGroupVector,
    /// Fields that must stay evaluable on the geometry at a socket.
    /// Always a subset of `available_fields_by_geometry_socket`.
    pub required_fields_by_geometry_socket: BitGroupVector,
    /// Group output geometry indices that receive an input geometry.
    pub propagated_output_geometry_indices: Vec<usize>,
    pub propagate_to_output_by_geometry_socket: BitGroupVector,
    pub tree_relations: RelationsInNode,
}

impl InferenceResult {
    pub fn field_sources_for_geometry(&self, geometry_source: usize) -> impl Iterator<Item = &FieldSource> + '_ {
        self.geometry_sources
            .get(geometry_source)
            .into_iter()
            .flat_map(|source| source.field_sources.iter())
            .map(|&field_index| &self.field_sources[field_index])
    }

    pub fn propagated_fields(&self, socket: SocketId) -> impl Iterator<Item = usize> + '_ {
        self.propagated_fields_by_socket.iter_ones(socket.index())
    }

    pub fn propagated_geometries(&self, socket: SocketId) -> impl Iterator<Item = usize> + '_ {
        self.propagated_geometries_by_socket.iter_ones(socket.index())
    }

    pub fn available_fields(&self, socket: SocketId) -> impl Iterator<Item = usize> + '_ {
        self.available_fields_by_geometry_socket.iter_ones(socket.index())
    }

    pub fn required_fields(&self, socket: SocketId) -> impl Iterator<Item = usize> + '_ {
        self.required_fields_by_geometry_socket.iter_ones(socket.index())
    }

    /// Positions in `propagated_output_geometry_indices` the geometry at `socket` may end up in.
    pub fn propagated_to_outputs(&self, socket: SocketId) -> impl Iterator<Item = usize> + '_ {
        self.propagate_to_output_by_geometry_socket.iter_ones(socket.index())
    }

    /// Index of the field source created at `socket`, if any.
    pub fn field_source_at(&self, socket: SocketId) -> Option<usize> {
        self.field_sources
            .iter()
            .position(|source| source.origin == SourceOrigin::Socket(socket))
    }

    pub fn geometry_source_at(&self, socket: SocketId) -> Option<usize> {
        self.geometry_sources
            .iter()
            .position(|source| source.origin == SourceOrigin::Socket(socket))
    }
}
