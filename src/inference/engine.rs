//! engine.rs
//! Fixed-point propagation of field and geometry sources through a tree.
//! One pass left to right finds what may reach each socket, one pass right to
//! left finds which fields every geometry socket has to keep alive.

use super::sources::{FieldSource, GeometrySource, SourceOrigin};
use super::InferenceResult;
use crate::analysis::topology;
use crate::bits::BitGroupVector;
use crate::graph::NodeTree;
use crate::relations::{
    relations_for_node, AvailableRelation, EvalRelation, PropagateRelation, ReferenceRelation,
    RelationsInNode,
};
use crate::store::{NodeId, SocketId, SocketType};
use log::{debug, warn};
use std::borrow::Cow;
use std::collections::HashMap;

/// Runs the inference on `tree`. Returns `None` if the used links form a cycle.
pub fn infer(tree: &NodeTree) -> Option<InferenceResult> {
    let (left_to_right, right_to_left) = match topology::sort_both_ways(tree) {
        Ok(orders) => orders,
        Err(err) => {
            warn!("Skipping anonymous attribute inferencing of '{}': {}", tree.name(), err);
            return None;
        }
    };

    let result = Inferencer::new(tree).run(&left_to_right, &right_to_left);
    debug!(
        "Anonymous attribute inferencing of '{}': {} field sources, {} geometry sources, {} tree relations",
        tree.name(),
        result.field_sources.len(),
        result.geometry_sources.len(),
        relation_count(&result.tree_relations),
    );
    Some(result)
}

fn relation_count(relations: &RelationsInNode) -> usize {
    relations.reference_relations.len()
        + relations.propagate_relations.len()
        + relations.eval_relations.len()
        + relations.available_relations.len()
}

struct Inferencer<'a> {
    tree: &'a NodeTree,
    relations_by_node: Vec<Cow<'a, RelationsInNode>>,
    field_sources: Vec<FieldSource>,
    geometry_sources: Vec<GeometrySource>,
    group_input_nodes: Vec<NodeId>,
}

/// Bit relations filled by the forward pass.
struct Propagation {
    fields: BitGroupVector,
    geometries: BitGroupVector,
    available_fields: BitGroupVector,
}

impl<'a> Inferencer<'a> {
    fn new(tree: &'a NodeTree) -> Self {
        Self {
            tree,
            relations_by_node: tree.node_ids().map(|node| relations_for_node(tree, node)).collect(),
            field_sources: Vec::new(),
            geometry_sources: Vec::new(),
            group_input_nodes: tree.group_input_nodes(),
        }
    }

    fn run(mut self, left_to_right: &[NodeId], right_to_left: &[NodeId]) -> InferenceResult {
        self.collect_input_sources();
        self.collect_socket_sources();

        let mut propagation = self.seed_propagation();
        self.propagate_forward(left_to_right, &mut propagation);

        let sockets_num = self.tree.socket_count();
        let mut required_fields = BitGroupVector::new(sockets_num, self.field_sources.len(), false);
        let (mut tree_relations, propagated_output_geometry_indices) =
            self.output_relations(&propagation, &mut required_fields);

        let mut propagate_to_output =
            BitGroupVector::new(sockets_num, propagated_output_geometry_indices.len(), false);
        if let Some(group_output) = self.tree.group_output_node() {
            for (i, &output_index) in propagated_output_geometry_indices.iter().enumerate() {
                if let Some(socket) = self.tree.input(group_output, output_index) {
                    propagate_to_output.set(socket.index(), i);
                }
            }
        }
        self.propagate_backward(right_to_left, &propagation.fields, &mut required_fields, &mut propagate_to_output);

        // Only fields that are available on a geometry can be required on it.
        required_fields.and_all(&propagation.available_fields);

        tree_relations.eval_relations = self.input_eval_relations(&required_fields);

        InferenceResult {
            field_sources: self.field_sources,
            geometry_sources: self.geometry_sources,
            propagated_fields_by_socket: propagation.fields,
            propagated_geometries_by_socket: propagation.geometries,
            available_fields_by_geometry_socket: propagation.available_fields,
            required_fields_by_geometry_socket: required_fields,
            propagated_output_geometry_indices,
            propagate_to_output_by_geometry_socket: propagate_to_output,
            tree_relations,
        }
    }

    /// Interface inputs. Every input geometry may carry every input field.
    fn collect_input_sources(&mut self) {
        for (i, socket) in self.tree.interface().inputs.iter().enumerate() {
            if socket.ty == SocketType::Geometry {
                self.geometry_sources.push(GeometrySource::new(SourceOrigin::TreeInput(i)));
            } else if socket.ty.supports_fields() {
                self.field_sources.push(FieldSource::new(SourceOrigin::TreeInput(i)));
            }
        }
        for geometry_index in 0..self.geometry_sources.len() {
            for field_index in 0..self.field_sources.len() {
                self.geometry_sources[geometry_index].field_sources.push(field_index);
                self.field_sources[field_index].geometry_sources.push(geometry_index);
            }
        }
    }

    /// Field outputs that are available on a geometry output of the same node.
    /// Only outputs that actually feed something downstream become sources.
    fn collect_socket_sources(&mut self) {
        let tree = self.tree;
        let mut field_source_by_socket: HashMap<SocketId, usize> = HashMap::new();
        let mut geometry_source_by_socket: HashMap<SocketId, usize> = HashMap::new();

        for node in tree.node_ids() {
            for relation in &self.relations_by_node[node.index()].available_relations {
                let (Some(field_socket), Some(geometry_socket)) = (
                    tree.output(node, relation.field_output),
                    tree.output(node, relation.geometry_output),
                ) else {
                    continue;
                };
                if !tree.socket(field_socket).available {
                    continue;
                }
                if tree.used_links_of(field_socket).next().is_none() {
                    continue;
                }

                let field_sources = &mut self.field_sources;
                let field_index = *field_source_by_socket.entry(field_socket).or_insert_with(|| {
                    field_sources.push(FieldSource::new(SourceOrigin::Socket(field_socket)));
                    field_sources.len() - 1
                });
                let geometry_sources = &mut self.geometry_sources;
                let geometry_index = *geometry_source_by_socket.entry(geometry_socket).or_insert_with(|| {
                    geometry_sources.push(GeometrySource::new(SourceOrigin::Socket(geometry_socket)));
                    geometry_sources.len() - 1
                });
                let paired = &mut self.field_sources[field_index].geometry_sources;
                if !paired.contains(&geometry_index) {
                    paired.push(geometry_index);
                }
                let paired = &mut self.geometry_sources[geometry_index].field_sources;
                if !paired.contains(&field_index) {
                    paired.push(field_index);
                }
            }
        }
    }

    /// Sockets where sources originate (per group input node for tree inputs).
    fn origin_sockets(&self, origin: SourceOrigin) -> Vec<SocketId> {
        match origin {
            SourceOrigin::TreeInput(input_index) => self
                .group_input_nodes
                .iter()
                .filter_map(|&node| self.tree.output(node, input_index))
                .collect(),
            SourceOrigin::Socket(socket) => vec![socket],
        }
    }

    fn seed_propagation(&self) -> Propagation {
        let sockets_num = self.tree.socket_count();
        let mut propagation = Propagation {
            fields: BitGroupVector::new(sockets_num, self.field_sources.len(), false),
            geometries: BitGroupVector::new(sockets_num, self.geometry_sources.len(), false),
            available_fields: BitGroupVector::new(sockets_num, self.field_sources.len(), false),
        };
        for (field_index, source) in self.field_sources.iter().enumerate() {
            for socket in self.origin_sockets(source.origin) {
                propagation.fields.set(socket.index(), field_index);
            }
        }
        for (geometry_index, source) in self.geometry_sources.iter().enumerate() {
            for socket in self.origin_sockets(source.origin) {
                propagation.geometries.set(socket.index(), geometry_index);
                for &field_index in &source.field_sources {
                    propagation.available_fields.set(socket.index(), field_index);
                }
            }
        }
        propagation
    }

    /// Socket indices of an input/output pair of `node`, if both exist and are available.
    fn available_pair(&self, node: NodeId, input_index: usize, output_index: usize) -> Option<(usize, usize)> {
        let input = self.tree.input(node, input_index)?;
        let output = self.tree.output(node, output_index)?;
        (self.tree.socket(input).available && self.tree.socket(output).available)
            .then(|| (input.index(), output.index()))
    }

    fn propagate_forward(&self, left_to_right: &[NodeId], propagation: &mut Propagation) {
        let tree = self.tree;
        for &node in left_to_right {
            // 1. Pull from linked sockets on the left
            for input in tree.inputs(node) {
                if !tree.socket(input).available {
                    continue;
                }
                let dst = input.index();
                for link in tree.used_links_of(input) {
                    let src = link.from_socket.index();
                    propagation.fields.or_groups(dst, src);
                    propagation.geometries.or_groups(dst, src);
                    propagation.available_fields.or_groups(dst, src);
                }
            }

            // 2. Pass through the node itself
            let relations = &self.relations_by_node[node.index()];
            for &ReferenceRelation { from_field_input, to_field_output } in &relations.reference_relations {
                if let Some((from, to)) = self.available_pair(node, from_field_input, to_field_output) {
                    propagation.fields.or_groups(to, from);
                }
            }
            for &PropagateRelation { from_geometry_input, to_geometry_output } in &relations.propagate_relations {
                if let Some((from, to)) = self.available_pair(node, from_geometry_input, to_geometry_output) {
                    propagation.geometries.or_groups(to, from);
                    propagation.available_fields.or_groups(to, from);
                }
            }
        }
    }

    /// Derives the tree-level reference, propagate and available relations
    /// from what arrives at the group output. Marks the fields an output
    /// geometry must keep because they are also output as fields.
    fn output_relations(
        &self,
        propagation: &Propagation,
        required_fields: &mut BitGroupVector,
    ) -> (RelationsInNode, Vec<usize>) {
        let tree = self.tree;
        let mut relations = RelationsInNode::default();
        let mut propagated_output_geometry_indices = Vec::new();

        let Some(group_output) = tree.group_output_node() else {
            return (relations, propagated_output_geometry_indices);
        };
        let output_sockets: Vec<SocketId> = tree.inputs(group_output).collect();

        for (output_index, &socket_id) in output_sockets.iter().enumerate() {
            let socket = tree.socket(socket_id);
            let socket_i = socket_id.index();

            if socket.is_geometry() {
                for geometry_index in propagation.geometries.iter_ones(socket_i) {
                    let source = &self.geometry_sources[geometry_index];
                    match source.origin {
                        SourceOrigin::TreeInput(input_index) => {
                            relations.propagate_relations.push(PropagateRelation {
                                from_geometry_input: input_index,
                                to_geometry_output: output_index,
                            });
                            if !propagated_output_geometry_indices.contains(&output_index) {
                                propagated_output_geometry_indices.push(output_index);
                            }
                        }
                        SourceOrigin::Socket(_) => {
                            for &other_id in &output_sockets {
                                let other = tree.socket(other_id);
                                if !other.ty.supports_fields() {
                                    continue;
                                }
                                for &field_index in &source.field_sources {
                                    if !propagation.fields.get(other_id.index(), field_index) {
                                        continue;
                                    }
                                    let relation = AvailableRelation {
                                        field_output: other.index_in_node,
                                        geometry_output: output_index,
                                    };
                                    if !relations.available_relations.contains(&relation) {
                                        relations.available_relations.push(relation);
                                    }
                                    required_fields.set(socket_i, field_index);
                                }
                            }
                        }
                    }
                }
            } else if socket.is_field() {
                for field_index in propagation.fields.iter_ones(socket_i) {
                    if let SourceOrigin::TreeInput(input_index) = self.field_sources[field_index].origin {
                        relations.reference_relations.push(ReferenceRelation {
                            from_field_input: input_index,
                            to_field_output: output_index,
                        });
                    }
                }
            }
        }
        (relations, propagated_output_geometry_indices)
    }

    fn propagate_backward(
        &self,
        right_to_left: &[NodeId],
        propagated_fields: &BitGroupVector,
        required_fields: &mut BitGroupVector,
        propagate_to_output: &mut BitGroupVector,
    ) {
        let tree = self.tree;
        for &node in right_to_left {
            // 1. Pull from linked sockets on the right
            for output in tree.outputs(node) {
                if !tree.socket(output).available {
                    continue;
                }
                let dst = output.index();
                for link in tree.used_links_of(output) {
                    let src = link.to_socket.index();
                    required_fields.or_groups(dst, src);
                    propagate_to_output.or_groups(dst, src);
                }
            }

            // 2. Pass back through the node itself
            let relations = &self.relations_by_node[node.index()];
            for &PropagateRelation { from_geometry_input, to_geometry_output } in &relations.propagate_relations {
                if let Some((input, output)) = self.available_pair(node, from_geometry_input, to_geometry_output) {
                    required_fields.or_groups(input, output);
                    propagate_to_output.or_groups(input, output);
                }
            }
            for &EvalRelation { field_input, geometry_input } in &relations.eval_relations {
                let (Some(field), Some(geometry)) = (tree.input(node, field_input), tree.input(node, geometry_input)) else {
                    continue;
                };
                required_fields.or_group_from(geometry.index(), propagated_fields, field.index());
            }
        }
    }

    /// Input fields that have to be evaluated on an input geometry.
    fn input_eval_relations(&self, required_fields: &BitGroupVector) -> Vec<EvalRelation> {
        let mut eval_relations = Vec::new();
        for (geometry_input, socket) in self.tree.interface().inputs.iter().enumerate() {
            if socket.ty != SocketType::Geometry {
                continue;
            }
            let mut required = BitGroupVector::new(1, self.field_sources.len(), false);
            for &node in &self.group_input_nodes {
                if let Some(socket) = self.tree.output(node, geometry_input) {
                    required.or_group_from(0, required_fields, socket.index());
                }
            }
            for field_index in required.iter_ones(0) {
                if let Some(field_input) = self.field_sources[field_index].origin.tree_input() {
                    eval_relations.push(EvalRelation { field_input, geometry_input });
                }
            }
        }
        eval_relations
    }
}
