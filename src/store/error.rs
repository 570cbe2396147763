//! Errors raised while building or loading a node tree.
use super::types::{LinkId, NodeId, SocketId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),
    #[error("Unknown socket: {0:?}")]
    UnknownSocket(SocketId),
    #[error("Unknown link: {0:?}")]
    UnknownLink(LinkId),
    #[error("Socket index {index} out of range for node '{node}'")]
    SocketOutOfRange { node: String, index: usize },
    #[error("Links must go from an output socket to an input socket")]
    LinkDirection,
    #[error("Cannot link node '{0}' to itself")]
    SelfLink(String),
    #[error("Node '{0}' is not a simulation input")]
    NotSimulationInput(String),
    #[error("Node '{0}' is not a simulation output")]
    NotSimulationOutput(String),
    #[error("Unknown node '{node}' in tree '{tree}'")]
    UnknownNodeName { tree: String, node: String },
    #[error("Duplicate node '{node}' in tree '{tree}'")]
    DuplicateNode { tree: String, node: String },
    #[error("Duplicate tree name: '{0}'")]
    DuplicateTree(String),
    #[error("Unknown group tree: '{0}'")]
    UnknownTree(String),
    #[error("Invalid tree description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
