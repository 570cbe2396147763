//! library.rs
//! JSON descriptions of node trees. A library lists trees in dependency
//! order; group nodes refer to trees listed before them by name.

use super::error::TreeError;
use super::types::{NodeDeclaration, NodeId, SocketDecl, TreeInterface};
use crate::graph::NodeTree;
use crate::relations::RelationsInNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDescription {
    pub trees: Vec<TreeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDescription {
    pub name: String,
    #[serde(default = "default_registered")]
    pub registered: bool,
    #[serde(default)]
    pub interface: TreeInterface,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

fn default_registered() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDescription {
    GroupInput {
        name: String,
    },
    GroupOutput {
        name: String,
    },
    Reroute {
        name: String,
        socket: SocketDecl,
    },
    Group {
        name: String,
        /// Name of a tree listed earlier. Absent for a group with a missing tree.
        #[serde(default)]
        tree: Option<String>,
    },
    SimulationInput {
        name: String,
        #[serde(default)]
        items: Vec<SocketDecl>,
        /// Name of the paired output marker.
        #[serde(default)]
        output: Option<String>,
    },
    SimulationOutput {
        name: String,
        #[serde(default)]
        items: Vec<SocketDecl>,
    },
    Node {
        name: String,
        #[serde(default)]
        inputs: Vec<SocketDecl>,
        #[serde(default)]
        outputs: Vec<SocketDecl>,
        #[serde(default)]
        relations: Option<RelationsInNode>,
    },
}

impl NodeDescription {
    pub fn name(&self) -> &str {
        match self {
            NodeDescription::GroupInput { name }
            | NodeDescription::GroupOutput { name }
            | NodeDescription::Reroute { name, .. }
            | NodeDescription::Group { name, .. }
            | NodeDescription::SimulationInput { name, .. }
            | NodeDescription::SimulationOutput { name, .. }
            | NodeDescription::Node { name, .. } => name,
        }
    }
}

/// `from` is (node name, output index), `to` is (node name, input index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub from: (String, usize),
    pub to: (String, usize),
    #[serde(default)]
    pub muted: bool,
}

/// Trees built from a [`LibraryDescription`], in listing order.
#[derive(Debug, Clone, Default)]
pub struct Library {
    trees: Vec<Arc<NodeTree>>,
}

impl Library {
    pub fn get(&self, name: &str) -> Option<&Arc<NodeTree>> {
        self.trees.iter().find(|tree| tree.name() == name)
    }

    pub fn trees(&self) -> &[Arc<NodeTree>] {
        &self.trees
    }

    pub fn len(&self) -> usize { self.trees.len() }
    pub fn is_empty(&self) -> bool { self.trees.is_empty() }
}

impl LibraryDescription {
    pub fn build(&self) -> Result<Library, TreeError> {
        let mut library = Library::default();
        for description in &self.trees {
            if library.get(&description.name).is_some() {
                return Err(TreeError::DuplicateTree(description.name.clone()));
            }
            let tree = description.build(&library)?;
            library.trees.push(Arc::new(tree));
        }
        Ok(library)
    }
}

impl TreeDescription {
    /// Builds the tree. Group nodes are resolved against `library`.
    pub fn build(&self, library: &Library) -> Result<NodeTree, TreeError> {
        let mut tree = NodeTree::new(self.name.clone(), self.interface.clone());
        tree.set_registered(self.registered);

        // 1. Nodes
        let mut by_name: HashMap<&str, NodeId> = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let id = match node {
                NodeDescription::GroupInput { .. } => tree.add_group_input(),
                NodeDescription::GroupOutput { .. } => tree.add_group_output(),
                NodeDescription::Reroute { socket, .. } => tree.add_reroute(socket.clone()),
                NodeDescription::Group { name, tree: group } => {
                    let group = match group {
                        Some(group) => Some(
                            library
                                .get(group)
                                .cloned()
                                .ok_or_else(|| TreeError::UnknownTree(group.clone()))?,
                        ),
                        None => None,
                    };
                    tree.add_group(name.clone(), group)
                }
                NodeDescription::SimulationInput { name, items, .. } => {
                    tree.add_simulation_input(name.clone(), items, None)?
                }
                NodeDescription::SimulationOutput { name, items } => tree.add_simulation_output(name.clone(), items),
                NodeDescription::Node { name, inputs, outputs, relations } => tree.add_node(
                    name.clone(),
                    NodeDeclaration { inputs: inputs.clone(), outputs: outputs.clone(), relations: relations.clone() },
                ),
            };
            tree.set_node_name(id, node.name());
            if by_name.insert(node.name(), id).is_some() {
                return Err(TreeError::DuplicateNode { tree: self.name.clone(), node: node.name().to_string() });
            }
        }

        let lookup = |name: &str| {
            by_name.get(name).copied().ok_or_else(|| TreeError::UnknownNodeName {
                tree: self.name.clone(),
                node: name.to_string(),
            })
        };

        // 2. Zone pairs (the output marker may be listed after its input marker)
        for node in &self.nodes {
            if let NodeDescription::SimulationInput { name, output: Some(output), .. } = node {
                tree.set_simulation_partner(lookup(name)?, Some(lookup(output)?))?;
            }
        }

        // 3. Links
        for link in &self.links {
            let id = tree.connect(lookup(&link.from.0)?, link.from.1, lookup(&link.to.0)?, link.to.1)?;
            if link.muted {
                tree.set_link_muted(id, true)?;
            }
        }
        Ok(tree)
    }
}

pub fn load_library(json: &str) -> Result<Library, TreeError> {
    let description: LibraryDescription = serde_json::from_str(json)?;
    description.build()
}

pub fn load_library_from_path(path: impl AsRef<Path>) -> Result<Library, TreeError> {
    let json = std::fs::read_to_string(path)?;
    load_library(&json)
}
