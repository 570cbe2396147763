//! forest.rs
//! The zones of one tree and the membership queries consumers run on them.
//! Zones refer to each other and to nodes by index; the forest owns them all.

use crate::graph::NodeTree;
use crate::store::{LinkId, NodeId, SocketId};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zone {
    /// Position in [`ZoneForest::zones`].
    pub index: usize,
    /// 0 for zones that are not nested in another zone.
    pub depth: usize,
    pub input_node: Option<NodeId>,
    pub output_node: Option<NodeId>,
    pub parent_zone: Option<usize>,
    pub child_zones: SmallVec<[usize; 4]>,
    /// Nodes directly inside this zone, not inside one of its children.
    /// The anchors of child zones are listed here too.
    pub child_nodes: Vec<NodeId>,
    /// Used links entering this zone from outside of it.
    pub border_links: Vec<LinkId>,
}

impl Zone {
    pub(crate) fn new(index: usize, output_node: NodeId) -> Self {
        Self { index, output_node: Some(output_node), ..Default::default() }
    }

    pub fn is_anchor(&self, node: NodeId) -> bool {
        self.input_node == Some(node) || self.output_node == Some(node)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneForest {
    pub zones: Vec<Zone>,
    pub root_zones: Vec<usize>,
    /// Nodes outside of every zone.
    pub root_nodes: Vec<NodeId>,
    /// Node identifier to the innermost zone containing the node.
    pub zone_by_node: HashMap<u32, usize>,
}

impl ZoneForest {
    pub fn len(&self) -> usize { self.zones.len() }
    pub fn is_empty(&self) -> bool { self.zones.is_empty() }
    pub fn zone(&self, index: usize) -> Option<&Zone> { self.zones.get(index) }

    pub fn get_zone_by_node(&self, tree: &NodeTree, node: NodeId) -> Option<&Zone> {
        let index = *self.zone_by_node.get(&tree.meta(node).identifier)?;
        self.zones.get(index)
    }

    /// The zone a socket is in. The inner side of a zone's anchors (outputs of
    /// the input marker, inputs of the output marker) belongs to the zone itself,
    /// while the anchor nodes belong to the enclosing zone.
    pub fn get_zone_by_socket(&self, tree: &NodeTree, socket: SocketId) -> Option<&Zone> {
        let socket = tree.socket(socket);
        if let Some(zone) = self.zone_for_anchor(socket.node) {
            let inner_side = (socket.is_output() && zone.input_node == Some(socket.node))
                || (socket.is_input() && zone.output_node == Some(socket.node));
            if inner_side {
                return Some(zone);
            }
        }
        self.get_zone_by_node(tree, socket.node)
    }

    /// The zone `node` is the input or output marker of.
    pub fn zone_for_anchor(&self, node: NodeId) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.is_anchor(node))
    }

    /// True if `inner` is nested (at any depth) in `outer`. A zone does not contain itself.
    pub fn contains_zone_recursively(&self, outer: usize, inner: usize) -> bool {
        let mut current = self.zones.get(inner).and_then(|zone| zone.parent_zone);
        while let Some(index) = current {
            if index == outer {
                return true;
            }
            current = self.zones[index].parent_zone;
        }
        false
    }

    pub fn contains_node_recursively(&self, tree: &NodeTree, zone: usize, node: NodeId) -> bool {
        match self.get_zone_by_node(tree, node) {
            Some(node_zone) => node_zone.index == zone || self.contains_zone_recursively(zone, node_zone.index),
            None => false,
        }
    }

    /// Zones containing `node`, outermost first.
    pub fn get_zone_stack_for_node(&self, tree: &NodeTree, node: NodeId) -> Vec<usize> {
        let mut stack = Vec::new();
        let mut current = self.get_zone_by_node(tree, node).map(|zone| zone.index);
        while let Some(index) = current {
            stack.push(index);
            current = self.zones[index].parent_zone;
        }
        stack.reverse();
        stack
    }

    /// Zones ordered so that nested zones come before the zones containing them.
    pub fn zone_build_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.zones.len()).collect();
        order.sort_by(|&a, &b| self.zones[b].depth.cmp(&self.zones[a].depth));
        order
    }
}
