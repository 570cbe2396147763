use crate::graph::NodeTree;
use crate::store::{NodeId, NodeKind};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Cycle detected involving node {}", .node.index())]
    Cycle { node: NodeId },
}

/// Which edges take part in the ordering, on top of the used links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneEdges {
    Ignore,
    /// Adds an edge from each zone's input marker to its output marker.
    Include,
}

/// Returns the nodes so that every used link goes from an earlier node to a later one.
///
/// Node-level graph: one vertex per node (vertex `i` is node `i`), one edge per
/// used link. Muted and unavailable links do not constrain the order.
pub fn sort(tree: &NodeTree, zone_edges: ZoneEdges) -> Result<Vec<NodeId>, TopologyError> {
    let graph = dependency_graph(tree, zone_edges);
    algo::toposort(&graph, None)
        .map(|order| order.into_iter().map(|ix| NodeId::new(ix.index())).collect())
        .map_err(|cycle| TopologyError::Cycle { node: NodeId::new(cycle.node_id().index()) })
}

/// Left-to-right order followed by its reverse.
pub fn sort_both_ways(tree: &NodeTree) -> Result<(Vec<NodeId>, Vec<NodeId>), TopologyError> {
    let left_to_right = sort(tree, ZoneEdges::Ignore)?;
    let right_to_left = left_to_right.iter().rev().copied().collect();
    Ok((left_to_right, right_to_left))
}

pub fn has_used_link_cycle(tree: &NodeTree) -> bool {
    algo::is_cyclic_directed(&dependency_graph(tree, ZoneEdges::Ignore))
}

fn dependency_graph(tree: &NodeTree, zone_edges: ZoneEdges) -> DiGraph<(), ()> {
    let mut graph = DiGraph::with_capacity(tree.node_count(), tree.store.link_count());
    for _ in 0..tree.node_count() {
        graph.add_node(());
    }
    for (id, link) in tree.links() {
        if tree.is_link_used(id) {
            graph.add_edge(NodeIndex::new(link.from_node.index()), NodeIndex::new(link.to_node.index()), ());
        }
    }
    if zone_edges == ZoneEdges::Include {
        // Only the first input marker per output is attached to a zone; later ones add no edge.
        let mut paired_outputs = HashSet::new();
        for node in tree.node_ids() {
            let NodeKind::SimulationInput { output_node: Some(identifier) } = tree.kind(node) else {
                continue;
            };
            let Some(output) = tree.node_by_identifier(*identifier) else {
                continue;
            };
            if !matches!(tree.kind(output), NodeKind::SimulationOutput) || !paired_outputs.insert(output) {
                continue;
            }
            graph.add_edge(NodeIndex::new(node.index()), NodeIndex::new(output.index()), ());
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NodeDeclaration, SocketDecl, SocketType, TreeInterface};

    fn pass_node(tree: &mut NodeTree, name: &str) -> NodeId {
        tree.add_node(
            name,
            NodeDeclaration {
                inputs: vec![SocketDecl::new("A", SocketType::Float), SocketDecl::new("B", SocketType::Float)],
                outputs: vec![SocketDecl::new("Out", SocketType::Float)],
                relations: None,
            },
        )
    }

    #[test]
    fn test_sort_diamond_dependency() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut tree = NodeTree::new("T", TreeInterface::default());
        let d = pass_node(&mut tree, "D");
        let c = pass_node(&mut tree, "C");
        let b = pass_node(&mut tree, "B");
        let a = pass_node(&mut tree, "A");
        tree.connect(a, 0, b, 0).unwrap();
        tree.connect(a, 0, c, 0).unwrap();
        tree.connect(b, 0, d, 0).unwrap();
        tree.connect(c, 0, d, 1).unwrap();

        let res = sort(&tree, ZoneEdges::Ignore).expect("Sort failed");
        let pos = |id: NodeId| res.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));

        let (ltr, rtl) = sort_both_ways(&tree).unwrap();
        assert_eq!(ltr.first(), rtl.last());
    }

    #[test]
    fn test_cycle_detection_ignores_muted_links() {
        let mut tree = NodeTree::new("T", TreeInterface::default());
        let a = pass_node(&mut tree, "A");
        let b = pass_node(&mut tree, "B");
        tree.connect(a, 0, b, 0).unwrap();
        let back = tree.connect(b, 0, a, 0).unwrap();

        assert!(has_used_link_cycle(&tree));
        let err = sort(&tree, ZoneEdges::Ignore).unwrap_err();
        assert!(err.to_string().contains("Cycle detected"), "Msg: {}", err);

        tree.set_link_muted(back, true).unwrap();
        assert!(!has_used_link_cycle(&tree));
        assert_eq!(sort(&tree, ZoneEdges::Ignore).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_zone_edges_order_input_before_output() {
        let mut tree = NodeTree::new("T", TreeInterface::default());
        let output = tree.add_simulation_output("Out", &[]);
        let input = tree.add_simulation_input("In", &[], Some(output)).unwrap();

        let res = sort(&tree, ZoneEdges::Include).unwrap();
        assert_eq!(res, vec![input, output]);
    }

    #[test]
    fn test_zone_edges_skip_duplicate_input_markers() {
        let mut tree = NodeTree::new("T", TreeInterface::default());
        let output = tree.add_simulation_output("Out", &[SocketDecl::new("Geometry", SocketType::Geometry)]);
        let input = tree.add_simulation_input("In", &[SocketDecl::new("Geometry", SocketType::Geometry)], Some(output)).unwrap();
        let duplicate =
            tree.add_simulation_input("Dup", &[SocketDecl::new("Geometry", SocketType::Geometry)], Some(output)).unwrap();
        tree.connect(input, 0, output, 0).unwrap();
        tree.connect(output, 0, duplicate, 0).unwrap();

        let res = sort(&tree, ZoneEdges::Include).expect("Duplicate marker must not close a cycle");
        assert_eq!(res, vec![input, output, duplicate]);
    }
}
