//! Where a field or geometry entering the dataflow comes from.
use crate::store::SocketId;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    /// Tree interface input at this position.
    TreeInput(usize),
    /// Produced at a node output socket.
    Socket(SocketId),
}

impl SourceOrigin {
    pub fn tree_input(&self) -> Option<usize> {
        match self {
            SourceOrigin::TreeInput(index) => Some(*index),
            SourceOrigin::Socket(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSource {
    pub origin: SourceOrigin,
    /// Indices of the geometry sources this field can be evaluated on.
    pub geometry_sources: SmallVec<[usize; 4]>,
}

impl FieldSource {
    pub fn new(origin: SourceOrigin) -> Self {
        Self { origin, geometry_sources: SmallVec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySource {
    pub origin: SourceOrigin,
    /// Indices of the field sources that travel with this geometry.
    pub field_sources: SmallVec<[usize; 4]>,
}

impl GeometrySource {
    pub fn new(origin: SourceOrigin) -> Self {
        Self { origin, field_sources: SmallVec::new() }
    }
}
