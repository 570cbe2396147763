//! dag.rs
//! Wraps the low-level Registry with the tree-level API: typed construction,
//! socket/link queries and the lazily computed analysis caches.

use super::runtime::TreeRuntime;
use crate::inference::{self, InferenceResult};
use crate::store::registry::SocketLinks;
use crate::store::{
    LinkId, Link, NodeDeclaration, NodeId, NodeKind, NodeMetadata, Registry, Socket, SocketDecl,
    SocketId, TreeError, TreeInterface,
};
use crate::zones::{self, ZoneForest};
use std::sync::Arc;

#[derive(Debug)]
pub struct NodeTree {
    name: String,
    registered: bool,
    pub(crate) store: Registry,
    pub(crate) runtime: TreeRuntime,
}

/// Reported by [`NodeTree::ensure_anonymous_attribute_relations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationsUpdate {
    /// The inference ran during this call.
    pub recomputed: bool,
    /// The tree-level relations differ from the previously published ones.
    /// Trees embedding this one as a group have to be updated too.
    pub interface_changed: bool,
}

impl Clone for NodeTree {
    /// The copy starts with empty caches.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            registered: self.registered,
            store: self.store.clone(),
            runtime: TreeRuntime::default(),
        }
    }
}

impl NodeTree {
    pub fn new(name: impl Into<String>, interface: TreeInterface) -> Self {
        Self {
            name: name.into(),
            registered: true,
            store: Registry::new(interface),
            runtime: TreeRuntime::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn interface(&self) -> &TreeInterface { &self.store.interface }

    /// Unregistered trees have an unknown type; groups using them expose no relations.
    pub fn is_registered(&self) -> bool { self.registered }
    pub fn set_registered(&mut self, registered: bool) { self.registered = registered; }

    // --- Construction ---

    pub fn add_group_input(&mut self) -> NodeId {
        let outputs: Vec<SocketDecl> = self.interface().inputs.iter()
            .map(|s| SocketDecl::new(s.name.clone(), s.ty))
            .collect();
        self.push_node(NodeKind::GroupInput, "Group Input", &[], &outputs)
    }

    pub fn add_group_output(&mut self) -> NodeId {
        let inputs: Vec<SocketDecl> = self.interface().outputs.iter()
            .map(|s| SocketDecl::new(s.name.clone(), s.ty))
            .collect();
        self.push_node(NodeKind::GroupOutput, "Group Output", &inputs, &[])
    }

    pub fn add_reroute(&mut self, socket: SocketDecl) -> NodeId {
        let sockets = [socket];
        self.push_node(NodeKind::Reroute, "Reroute", &sockets, &sockets)
    }

    /// Adds a node embedding `tree`. Its sockets mirror the tree's interface.
    pub fn add_group(&mut self, name: impl Into<String>, tree: Option<Arc<NodeTree>>) -> NodeId {
        let (inputs, outputs): (Vec<SocketDecl>, Vec<SocketDecl>) = match &tree {
            Some(group) => (
                group.interface().inputs.iter().map(|s| SocketDecl::new(s.name.clone(), s.ty)).collect(),
                group.interface().outputs.iter().map(|s| SocketDecl::new(s.name.clone(), s.ty)).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        self.push_node(NodeKind::Group(tree), name, &inputs, &outputs)
    }

    pub fn add_simulation_output(&mut self, name: impl Into<String>, items: &[SocketDecl]) -> NodeId {
        self.push_node(NodeKind::SimulationOutput, name, items, items)
    }

    /// Adds a zone input marker, optionally paired with an existing output marker.
    pub fn add_simulation_input(
        &mut self,
        name: impl Into<String>,
        items: &[SocketDecl],
        output: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let id = self.push_node(NodeKind::SimulationInput { output_node: None }, name, items, items);
        self.store.set_simulation_partner(id, output)?;
        Ok(id)
    }

    pub fn add_node(&mut self, name: impl Into<String>, declaration: NodeDeclaration) -> NodeId {
        let declaration = Arc::new(declaration);
        let (inputs, outputs) = (declaration.inputs.clone(), declaration.outputs.clone());
        self.push_node(NodeKind::Generic(declaration), name, &inputs, &outputs)
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        inputs: &[SocketDecl],
        outputs: &[SocketDecl],
    ) -> NodeId {
        self.runtime.tag_topology_changed();
        self.store.add_node(kind, name, inputs, outputs)
    }

    pub fn add_link(&mut self, from: SocketId, to: SocketId) -> Result<LinkId, TreeError> {
        let id = self.store.add_link(from, to)?;
        self.runtime.tag_topology_changed();
        Ok(id)
    }

    /// Links output `from_index` of `from` to input `to_index` of `to`.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_index: usize,
        to: NodeId,
        to_index: usize,
    ) -> Result<LinkId, TreeError> {
        let from_socket = self.checked_output(from, from_index)?;
        let to_socket = self.checked_input(to, to_index)?;
        self.add_link(from_socket, to_socket)
    }

    pub fn remove_link(&mut self, id: LinkId) -> Result<(), TreeError> {
        self.store.remove_link(id)?;
        self.runtime.tag_topology_changed();
        Ok(())
    }

    pub fn set_link_muted(&mut self, id: LinkId, muted: bool) -> Result<(), TreeError> {
        self.store.set_link_muted(id, muted)?;
        self.runtime.tag_topology_changed();
        Ok(())
    }

    pub fn set_socket_available(&mut self, id: SocketId, available: bool) -> Result<(), TreeError> {
        self.store.set_socket_available(id, available)?;
        self.runtime.tag_topology_changed();
        Ok(())
    }

    pub fn set_simulation_partner(&mut self, input: NodeId, output: Option<NodeId>) -> Result<(), TreeError> {
        self.store.set_simulation_partner(input, output)?;
        self.runtime.tag_topology_changed();
        Ok(())
    }

    pub fn set_node_name(&mut self, node: NodeId, name: impl Into<String>) {
        self.store.meta[node.index()].name = name.into();
    }

    /// Forces the caches to be rebuilt on next access.
    pub fn tag_topology_changed(&mut self) {
        self.runtime.tag_topology_changed();
    }

    // --- Accessors ---

    pub fn node_count(&self) -> usize { self.store.count() }
    pub fn socket_count(&self) -> usize { self.store.socket_count() }
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = NodeId> { (0..self.store.count()).map(NodeId::new) }
    pub fn kind(&self, node: NodeId) -> &NodeKind { &self.store.kinds[node.index()] }
    pub fn meta(&self, node: NodeId) -> &NodeMetadata { &self.store.meta[node.index()] }
    pub fn socket(&self, id: SocketId) -> &Socket { &self.store.sockets[id.index()] }
    pub fn link(&self, id: LinkId) -> &Link { &self.store.links[id.index()] }
    pub fn inputs(&self, node: NodeId) -> impl ExactSizeIterator<Item = SocketId> { self.store.inputs(node) }
    pub fn outputs(&self, node: NodeId) -> impl ExactSizeIterator<Item = SocketId> { self.store.outputs(node) }
    pub fn input(&self, node: NodeId, index: usize) -> Option<SocketId> { self.store.input(node, index) }
    pub fn output(&self, node: NodeId, index: usize) -> Option<SocketId> { self.store.output(node, index) }
    pub fn links_of(&self, socket: SocketId) -> SocketLinks<'_> { self.store.links_of(socket) }
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> { self.store.alive_links() }
    pub fn node_by_identifier(&self, identifier: u32) -> Option<NodeId> { self.store.node_by_identifier(identifier) }

    pub fn is_link_used(&self, id: LinkId) -> bool { self.store.is_link_used(self.link(id)) }

    /// Used links arriving at (input) or leaving from (output) `socket`.
    pub fn used_links_of(&self, socket: SocketId) -> impl Iterator<Item = &Link> {
        self.links_of(socket)
            .map(|id| self.link(id))
            .filter(|link| self.store.is_link_used(link))
    }

    pub fn is_directly_linked(&self, socket: SocketId) -> bool {
        self.links_of(socket).next().is_some()
    }

    pub fn group_input_nodes(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| matches!(self.kind(n), NodeKind::GroupInput)).collect()
    }

    /// The first group output node, which defines the tree's outputs.
    pub fn group_output_node(&self) -> Option<NodeId> {
        self.node_ids().find(|&n| matches!(self.kind(n), NodeKind::GroupOutput))
    }

    fn checked_input(&self, node: NodeId, index: usize) -> Result<SocketId, TreeError> {
        if node.index() >= self.node_count() {
            return Err(TreeError::UnknownNode(node));
        }
        self.input(node, index).ok_or_else(|| TreeError::SocketOutOfRange {
            node: self.meta(node).name.clone(),
            index,
        })
    }

    fn checked_output(&self, node: NodeId, index: usize) -> Result<SocketId, TreeError> {
        if node.index() >= self.node_count() {
            return Err(TreeError::UnknownNode(node));
        }
        self.output(node, index).ok_or_else(|| TreeError::SocketOutOfRange {
            node: self.meta(node).name.clone(),
            index,
        })
    }

    // --- Cached analysis ---

    /// Anonymous attribute inference for the current topology, or `None` if the
    /// tree has a cycle among its used links.
    pub fn anonymous_attribute_inferencing(&self) -> Option<Arc<InferenceResult>> {
        self.runtime
            .anonymous_attribute_inferencing
            .ensure(|| inference::infer(self))
            .current
    }

    /// Brings the inference cache up to date and reports what changed.
    pub fn ensure_anonymous_attribute_relations(&self) -> RelationsUpdate {
        let refresh = self.runtime.anonymous_attribute_inferencing.ensure(|| inference::infer(self));
        let interface_changed = match (&refresh.previous, &refresh.current) {
            (Some(old), Some(new)) => old.tree_relations != new.tree_relations,
            (None, None) => false,
            _ => true,
        };
        RelationsUpdate {
            recomputed: refresh.recomputed,
            interface_changed: refresh.recomputed && interface_changed,
        }
    }

    /// Recomputes the inference unconditionally. Returns true when the
    /// tree-level relations changed.
    pub fn update_anonymous_attribute_relations(&self) -> bool {
        self.runtime.anonymous_attribute_inferencing.tag_dirty();
        self.ensure_anonymous_attribute_relations().interface_changed
    }

    /// Zone forest for the current topology, or `None` if the tree has no
    /// consistent zone structure.
    pub fn zones(&self) -> Option<Arc<ZoneForest>> {
        self.runtime.tree_zones.ensure(|| zones::discover_zones(self)).current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InterfaceSocket, SocketType};

    fn interface() -> TreeInterface {
        TreeInterface {
            inputs: vec![
                InterfaceSocket::new("Geometry", SocketType::Geometry),
                InterfaceSocket::new("Value", SocketType::Float),
            ],
            outputs: vec![InterfaceSocket::new("Geometry", SocketType::Geometry)],
        }
    }

    #[test]
    fn test_group_nodes_mirror_interface() {
        let mut tree = NodeTree::new("T", interface());
        let gi = tree.add_group_input();
        let go = tree.add_group_output();
        assert_eq!(tree.outputs(gi).len(), 2);
        assert_eq!(tree.inputs(go).len(), 1);
        assert!(tree.socket(tree.output(gi, 1).unwrap()).is_field());
        assert!(!tree.socket(tree.output(gi, 0).unwrap()).is_field());
        assert_eq!(tree.group_input_nodes(), vec![gi]);
        assert_eq!(tree.group_output_node(), Some(go));
    }

    #[test]
    fn test_connect_reports_bad_indices() {
        let mut tree = NodeTree::new("T", interface());
        let gi = tree.add_group_input();
        let go = tree.add_group_output();
        let err = tree.connect(gi, 5, go, 0).unwrap_err();
        assert!(err.to_string().contains("out of range"), "Msg: {}", err);
        assert!(matches!(tree.connect(gi, 0, NodeId(9), 0), Err(TreeError::UnknownNode(_))));
        tree.connect(gi, 0, go, 0).expect("valid link");
        assert!(tree.is_directly_linked(tree.output(gi, 0).unwrap()));
    }

    #[test]
    fn test_mutation_invalidates_caches() {
        let mut tree = NodeTree::new("T", interface());
        let gi = tree.add_group_input();
        let go = tree.add_group_output();

        let first = tree.ensure_anonymous_attribute_relations();
        assert!(first.recomputed);
        assert!(first.interface_changed);
        let again = tree.ensure_anonymous_attribute_relations();
        assert_eq!(again, RelationsUpdate { recomputed: false, interface_changed: false });

        let link = tree.connect(gi, 0, go, 0).unwrap();
        let linked = tree.ensure_anonymous_attribute_relations();
        assert!(linked.recomputed);
        assert!(linked.interface_changed);

        // Muting and unmuting ends up where it started.
        tree.set_link_muted(link, true).unwrap();
        assert!(tree.update_anonymous_attribute_relations());
        tree.set_link_muted(link, false).unwrap();
        assert!(tree.update_anonymous_attribute_relations());
        assert!(!tree.update_anonymous_attribute_relations());
    }

    #[test]
    fn test_clone_starts_with_fresh_caches() {
        let mut tree = NodeTree::new("T", interface());
        tree.add_group_input();
        assert!(tree.anonymous_attribute_inferencing().is_some());
        let copy = tree.clone();
        assert!(copy.runtime.anonymous_attribute_inferencing.is_dirty());
        assert!(!tree.runtime.anonymous_attribute_inferencing.is_dirty());
    }
}
