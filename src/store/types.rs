use crate::graph::NodeTree;
use crate::relations::RelationsInNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Index of a socket within the whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SocketId(pub u32);

impl SocketId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LinkId(pub u32);

impl LinkId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    Float,
    Int,
    Bool,
    Vector,
    Color,
    String,
    Geometry,
    Object,
    Material,
}

impl SocketType {
    /// Types whose values may vary per element.
    pub fn supports_fields(self) -> bool {
        matches!(self, Self::Float | Self::Int | Self::Bool | Self::Vector | Self::Color)
    }

    /// Shape a socket of this type gets when nothing more specific is declared.
    pub fn default_shape(self) -> DisplayShape {
        if self.supports_fields() { DisplayShape::DiamondDot } else { DisplayShape::Circle }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayShape {
    #[default]
    Circle,
    /// Always a field.
    Diamond,
    /// May be a field.
    DiamondDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketDirection {
    Input,
    Output,
}

/// Static description of one socket, used when declaring nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
    #[serde(default)]
    pub shape: Option<DisplayShape>,
}

impl SocketDecl {
    pub fn new(name: impl Into<String>, ty: SocketType) -> Self {
        Self { name: name.into(), ty, shape: None }
    }

    pub fn with_shape(mut self, shape: DisplayShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn resolved_shape(&self) -> DisplayShape {
        self.shape.unwrap_or_else(|| self.ty.default_shape())
    }
}

/// Declaration of an ordinary node: its sockets and, optionally, the
/// anonymous attribute relations between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeclaration {
    #[serde(default)]
    pub inputs: Vec<SocketDecl>,
    #[serde(default)]
    pub outputs: Vec<SocketDecl>,
    #[serde(default)]
    pub relations: Option<RelationsInNode>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    GroupInput,
    GroupOutput,
    Reroute,
    /// Embeds another tree. `None` when the referenced tree is missing.
    Group(Option<Arc<NodeTree>>),
    /// Zone input marker. Holds the identifier of its partner output marker.
    SimulationInput { output_node: Option<u32> },
    /// Zone output marker.
    SimulationOutput,
    Generic(Arc<NodeDeclaration>),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::GroupInput => "Group Input",
            NodeKind::GroupOutput => "Group Output",
            NodeKind::Reroute => "Reroute",
            NodeKind::Group(_) => "Group",
            NodeKind::SimulationInput { .. } => "Simulation Input",
            NodeKind::SimulationOutput => "Simulation Output",
            NodeKind::Generic(_) => "Node",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    pub name: String,
    /// Stable across insertions, unlike the node's position.
    pub identifier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    pub node: NodeId,
    pub direction: SocketDirection,
    /// Position among the owner node's inputs or outputs.
    pub index_in_node: usize,
    pub ty: SocketType,
    pub shape: DisplayShape,
    pub name: String,
    pub available: bool,
}

impl Socket {
    pub fn is_input(&self) -> bool { self.direction == SocketDirection::Input }
    pub fn is_output(&self) -> bool { self.direction == SocketDirection::Output }

    /// Field-shaped sockets are the ones anonymous attributes can be referenced through.
    pub fn is_field(&self) -> bool {
        matches!(self.shape, DisplayShape::Diamond | DisplayShape::DiamondDot)
    }

    pub fn is_geometry(&self) -> bool { self.ty == SocketType::Geometry }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub from_node: NodeId,
    pub from_socket: SocketId,
    pub to_node: NodeId,
    pub to_socket: SocketId,
    pub muted: bool,
}

/// Interface socket of a whole tree, mirrored by group input/output nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSocket {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
}

impl InterfaceSocket {
    pub fn new(name: impl Into<String>, ty: SocketType) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeInterface {
    #[serde(default)]
    pub inputs: Vec<InterfaceSocket>,
    #[serde(default)]
    pub outputs: Vec<InterfaceSocket>,
}
