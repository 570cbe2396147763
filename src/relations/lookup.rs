//! Static relations of a single node, by node kind.
use super::*;
use crate::graph::NodeTree;
use crate::store::{NodeId, NodeKind, SocketId};
use std::borrow::Cow;

/// Returns the relations declared by (or implied for) `node`.
///
/// Declarations are borrowed from the tree. Built-in kinds get their relations
/// built here. Anything without usable information gets an empty set.
pub fn relations_for_node(tree: &NodeTree, node: NodeId) -> Cow<'_, RelationsInNode> {
    match tree.kind(node) {
        NodeKind::Generic(declaration) => match &declaration.relations {
            Some(relations) => Cow::Borrowed(relations),
            None => Cow::Owned(RelationsInNode::default()),
        },
        NodeKind::Group(Some(group)) => {
            // Undefined tree types have no relations.
            if !group.is_registered() {
                return Cow::Owned(RelationsInNode::default());
            }
            let relations = group
                .anonymous_attribute_inferencing()
                .map(|result| result.tree_relations.clone())
                .unwrap_or_default();
            Cow::Owned(relations)
        }
        NodeKind::Reroute => Cow::Owned(reroute_relations(tree, node)),
        NodeKind::SimulationInput { .. } | NodeKind::SimulationOutput => {
            Cow::Owned(simulation_relations(tree, node))
        }
        NodeKind::Group(None) | NodeKind::GroupInput | NodeKind::GroupOutput => {
            Cow::Owned(RelationsInNode::default())
        }
    }
}

fn reroute_relations(tree: &NodeTree, node: NodeId) -> RelationsInNode {
    let mut relations = RelationsInNode::default();
    if let Some(input) = tree.input(node, 0) {
        let socket = tree.socket(input);
        if socket.is_field() {
            relations.reference_relations.push(ReferenceRelation { from_field_input: 0, to_field_output: 0 });
        } else if socket.is_geometry() {
            relations.propagate_relations.push(PropagateRelation { from_geometry_input: 0, to_geometry_output: 0 });
        }
    }
    relations
}

/// Every field item is tied to the closest geometry item before it.
fn simulation_relations(tree: &NodeTree, node: NodeId) -> RelationsInNode {
    let mut relations = RelationsInNode::default();

    for (field_input, geometry_input) in pair_with_preceding_geometry(tree, tree.inputs(node)) {
        relations.eval_relations.push(EvalRelation { field_input, geometry_input });
    }
    for (field_output, geometry_output) in pair_with_preceding_geometry(tree, tree.outputs(node)) {
        relations.available_relations.push(AvailableRelation { field_output, geometry_output });
    }
    relations
}

fn pair_with_preceding_geometry(
    tree: &NodeTree,
    sockets: impl Iterator<Item = SocketId>,
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut last_geometry = None;
    for (i, id) in sockets.enumerate() {
        let socket = tree.socket(id);
        if socket.is_geometry() {
            last_geometry = Some(i);
        } else if socket.is_field() {
            if let Some(geometry) = last_geometry {
                pairs.push((i, geometry));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DisplayShape, InterfaceSocket, NodeDeclaration, SocketDecl, SocketType, TreeInterface};
    use rstest::rstest;
    use std::sync::Arc;

    fn empty_tree() -> NodeTree {
        NodeTree::new("T", TreeInterface::default())
    }

    #[test]
    fn test_field_reroute_references_its_input() {
        let mut tree = empty_tree();
        let reroute = tree.add_reroute(SocketDecl::new("Value", SocketType::Float).with_shape(DisplayShape::Diamond));
        let relations = relations_for_node(&tree, reroute);
        assert_eq!(
            relations.reference_relations,
            vec![ReferenceRelation { from_field_input: 0, to_field_output: 0 }]
        );
        assert!(relations.propagate_relations.is_empty());
        assert!(relations.eval_relations.is_empty());
        assert!(relations.available_relations.is_empty());
    }

    #[rstest]
    #[case(SocketType::Geometry, DisplayShape::Circle, false, true)]
    #[case(SocketType::Float, DisplayShape::Circle, false, false)]
    #[case(SocketType::String, DisplayShape::Circle, false, false)]
    #[case(SocketType::Vector, DisplayShape::DiamondDot, true, false)]
    fn test_reroute_relations_follow_socket(
        #[case] ty: SocketType,
        #[case] shape: DisplayShape,
        #[case] references: bool,
        #[case] propagates: bool,
    ) {
        let mut tree = empty_tree();
        let reroute = tree.add_reroute(SocketDecl::new("Item", ty).with_shape(shape));
        let relations = relations_for_node(&tree, reroute);
        assert_eq!(!relations.reference_relations.is_empty(), references);
        assert_eq!(!relations.propagate_relations.is_empty(), propagates);
    }

    #[test]
    fn test_simulation_items_pair_with_preceding_geometry() {
        let mut tree = empty_tree();
        let items = [
            SocketDecl::new("Orphan", SocketType::Float),
            SocketDecl::new("Geometry", SocketType::Geometry),
            SocketDecl::new("A", SocketType::Float),
            SocketDecl::new("Name", SocketType::String),
            SocketDecl::new("Geometry 2", SocketType::Geometry),
            SocketDecl::new("B", SocketType::Vector),
        ];
        let out = tree.add_simulation_output("Simulation Output", &items);
        let relations = relations_for_node(&tree, out);
        assert_eq!(
            relations.eval_relations,
            vec![
                EvalRelation { field_input: 2, geometry_input: 1 },
                EvalRelation { field_input: 5, geometry_input: 4 },
            ]
        );
        assert_eq!(
            relations.available_relations,
            vec![
                AvailableRelation { field_output: 2, geometry_output: 1 },
                AvailableRelation { field_output: 5, geometry_output: 4 },
            ]
        );
    }

    #[test]
    fn test_declared_relations_are_borrowed() {
        let mut tree = empty_tree();
        let declaration = NodeDeclaration {
            inputs: vec![SocketDecl::new("Geometry", SocketType::Geometry)],
            outputs: vec![SocketDecl::new("Geometry", SocketType::Geometry)],
            relations: Some(RelationsInNode {
                propagate_relations: vec![PropagateRelation { from_geometry_input: 0, to_geometry_output: 0 }],
                ..Default::default()
            }),
        };
        let node = tree.add_node("Transform", declaration);
        let relations = relations_for_node(&tree, node);
        assert!(matches!(relations, Cow::Borrowed(_)));
        assert_eq!(relations.propagate_relations.len(), 1);

        let bare = tree.add_node("Bare", NodeDeclaration::default());
        assert!(relations_for_node(&tree, bare).is_empty());
    }

    fn pass_through_group() -> NodeTree {
        let mut group = NodeTree::new(
            "Pass",
            TreeInterface {
                inputs: vec![InterfaceSocket::new("Geometry", SocketType::Geometry)],
                outputs: vec![InterfaceSocket::new("Geometry", SocketType::Geometry)],
            },
        );
        let gi = group.add_group_input();
        let go = group.add_group_output();
        group.connect(gi, 0, go, 0).unwrap();
        group
    }

    #[test]
    fn test_group_exposes_sub_tree_relations() {
        let mut tree = empty_tree();
        let node = tree.add_group("Group", Some(Arc::new(pass_through_group())));
        let relations = relations_for_node(&tree, node);
        assert_eq!(
            relations.propagate_relations,
            vec![PropagateRelation { from_geometry_input: 0, to_geometry_output: 0 }]
        );
    }

    #[test]
    fn test_unusable_groups_have_no_relations() {
        let mut unregistered = pass_through_group();
        unregistered.set_registered(false);

        let mut tree = empty_tree();
        let undefined = tree.add_group("Undefined", Some(Arc::new(unregistered)));
        let missing = tree.add_group("Missing", None);
        assert!(relations_for_node(&tree, undefined).is_empty());
        assert!(relations_for_node(&tree, missing).is_empty());
    }
}
