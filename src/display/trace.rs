use crate::bits::BitGroupVector;
use crate::graph::NodeTree;
use crate::inference::{InferenceResult, SourceOrigin};
use crate::store::SocketId;
use crate::zones::ZoneForest;
use std::fmt::Write;

const RULE: &str = "--------------------------------------------------";

/// Human readable dump of an inference result: sources, the bits of every
/// socket that carries any, and the tree-level relations.
pub fn format_inference_trace(tree: &NodeTree, result: &InferenceResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ANONYMOUS ATTRIBUTE TRACE for tree '{}':", tree.name());
    let _ = writeln!(out, "{}", RULE);

    // 1. Sources
    let _ = writeln!(out, "Field sources:");
    for (i, source) in result.field_sources.iter().enumerate() {
        let connector = connector(i, result.field_sources.len());
        let geometries = list("G", source.geometry_sources.iter().copied());
        let _ = writeln!(out, "{} F{}: {} -> geometries {}", connector, i, describe_origin(tree, source.origin), geometries);
    }
    let _ = writeln!(out, "Geometry sources:");
    for (i, source) in result.geometry_sources.iter().enumerate() {
        let connector = connector(i, result.geometry_sources.len());
        let fields = list("F", source.field_sources.iter().copied());
        let _ = writeln!(out, "{} G{}: {} -> fields {}", connector, i, describe_origin(tree, source.origin), fields);
    }

    // 2. Sockets
    let _ = writeln!(out, "Sockets:");
    for node in tree.node_ids() {
        let lines: Vec<String> = tree
            .inputs(node)
            .chain(tree.outputs(node))
            .filter_map(|socket| socket_line(tree, result, socket))
            .collect();
        if lines.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{}] {}", tree.kind(node).label(), tree.meta(node).name);
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(out, "{} {}", connector(i, lines.len()), line);
        }
    }

    // 3. Tree relations
    let relations = &result.tree_relations;
    let mut lines = Vec::new();
    lines.extend(relations.reference_relations.iter().map(|r| {
        format!("reference field input {} -> field output {}", r.from_field_input, r.to_field_output)
    }));
    lines.extend(relations.propagate_relations.iter().map(|r| {
        format!("propagate geometry input {} -> geometry output {}", r.from_geometry_input, r.to_geometry_output)
    }));
    lines.extend(relations.eval_relations.iter().map(|r| {
        format!("eval field input {} on geometry input {}", r.field_input, r.geometry_input)
    }));
    lines.extend(relations.available_relations.iter().map(|r| {
        format!("available field output {} on geometry output {}", r.field_output, r.geometry_output)
    }));
    let _ = writeln!(out, "Tree relations:");
    if lines.is_empty() {
        let _ = writeln!(out, "`-- (none)");
    }
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(out, "{} {}", connector(i, lines.len()), line);
    }
    out
}

/// Indented zone hierarchy with the nodes directly inside each zone.
pub fn format_zone_tree(tree: &NodeTree, forest: &ZoneForest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ZONES of tree '{}':", tree.name());
    let _ = writeln!(out, "{}", RULE);
    for (i, &zone) in forest.root_zones.iter().enumerate() {
        let last = i + 1 == forest.root_zones.len() && forest.root_nodes.is_empty();
        write_zone(&mut out, tree, forest, zone, "", last);
    }
    if !forest.root_nodes.is_empty() {
        let names: Vec<&str> = forest.root_nodes.iter().map(|&n| tree.meta(n).name.as_str()).collect();
        let _ = writeln!(out, "`-- Outside zones: {}", names.join(", "));
    }
    out
}

fn write_zone(out: &mut String, tree: &NodeTree, forest: &ZoneForest, index: usize, stem: &str, is_last: bool) {
    let zone = &forest.zones[index];
    let anchor = |node: Option<_>| node.map_or("?", |n| tree.meta(n).name.as_str());
    let _ = writeln!(
        out,
        "{}{} [Z{}] '{}' .. '{}' (depth {})",
        stem,
        if is_last { "`--" } else { "|--" },
        zone.index,
        anchor(zone.input_node),
        anchor(zone.output_node),
        zone.depth
    );

    let child_stem = format!("{}{}", stem, if is_last { "    " } else { "|   " });
    if !zone.child_nodes.is_empty() {
        let names: Vec<&str> = zone.child_nodes.iter().map(|&n| tree.meta(n).name.as_str()).collect();
        let connector = if zone.child_zones.is_empty() { "`--" } else { "|--" };
        let _ = writeln!(out, "{}{} Nodes: {}", child_stem, connector, names.join(", "));
    }
    for (i, &child) in zone.child_zones.iter().enumerate() {
        write_zone(out, tree, forest, child, &child_stem, i + 1 == zone.child_zones.len());
    }
}

fn socket_line(tree: &NodeTree, result: &InferenceResult, socket_id: SocketId) -> Option<String> {
    let s = socket_id.index();
    let parts: Vec<String> = [
        ("fields", "F", &result.propagated_fields_by_socket),
        ("geometries", "G", &result.propagated_geometries_by_socket),
        ("available", "F", &result.available_fields_by_geometry_socket),
        ("required", "F", &result.required_fields_by_geometry_socket),
    ]
    .into_iter()
    .filter(|(_, _, bits)| !bits.group_is_empty(s))
    .map(|(label, prefix, bits): (&str, &str, &BitGroupVector)| format!("{} {}", label, list(prefix, bits.iter_ones(s))))
    .collect();
    if parts.is_empty() {
        return None;
    }
    let socket = tree.socket(socket_id);
    let direction = if socket.is_input() { "in" } else { "out" };
    Some(format!("{} {} '{}': {}", direction, socket.index_in_node, socket.name, parts.join(" ")))
}

fn describe_origin(tree: &NodeTree, origin: SourceOrigin) -> String {
    match origin {
        SourceOrigin::TreeInput(i) => {
            let name = tree.interface().inputs.get(i).map_or("?", |s| s.name.as_str());
            format!("tree input {} '{}'", i, name)
        }
        SourceOrigin::Socket(id) => {
            let socket = tree.socket(id);
            format!("output '{}' of '{}'", socket.name, tree.meta(socket.node).name)
        }
    }
}

fn list(prefix: &str, indices: impl Iterator<Item = usize>) -> String {
    let items: Vec<String> = indices.map(|i| format!("{}{}", prefix, i)).collect();
    format!("[{}]", items.join(", "))
}

fn connector(i: usize, len: usize) -> &'static str {
    if i + 1 == len { "`--" } else { "|--" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InterfaceSocket, NodeDeclaration, SocketDecl, SocketType, TreeInterface};
    use crate::relations::{EvalRelation, PropagateRelation, RelationsInNode};

    #[test]
    fn test_inference_trace_lists_sources_and_relations() {
        let mut tree = NodeTree::new(
            "Chain",
            TreeInterface {
                inputs: vec![
                    InterfaceSocket::new("Geometry", SocketType::Geometry),
                    InterfaceSocket::new("Offset", SocketType::Float),
                ],
                outputs: vec![InterfaceSocket::new("Geometry", SocketType::Geometry)],
            },
        );
        let gi = tree.add_group_input();
        let node = tree.add_node(
            "Set Position",
            NodeDeclaration {
                inputs: vec![SocketDecl::new("Geometry", SocketType::Geometry), SocketDecl::new("Offset", SocketType::Float)],
                outputs: vec![SocketDecl::new("Geometry", SocketType::Geometry)],
                relations: Some(RelationsInNode {
                    eval_relations: vec![EvalRelation { field_input: 1, geometry_input: 0 }],
                    propagate_relations: vec![PropagateRelation { from_geometry_input: 0, to_geometry_output: 0 }],
                    ..Default::default()
                }),
            },
        );
        let go = tree.add_group_output();
        tree.connect(gi, 0, node, 0).unwrap();
        tree.connect(gi, 1, node, 1).unwrap();
        tree.connect(node, 0, go, 0).unwrap();

        let result = tree.anonymous_attribute_inferencing().unwrap();
        let trace = format_inference_trace(&tree, &result);
        assert!(trace.starts_with("ANONYMOUS ATTRIBUTE TRACE for tree 'Chain':"));
        assert!(trace.contains("`-- F0: tree input 1 'Offset' -> geometries [G0]"), "Trace:\n{}", trace);
        assert!(trace.contains("[Node] Set Position"), "Trace:\n{}", trace);
        assert!(trace.contains("out 0 'Geometry': geometries [G0] available [F0] required [F0]"), "Trace:\n{}", trace);
        assert!(trace.contains("eval field input 1 on geometry input 0"), "Trace:\n{}", trace);
    }

    #[test]
    fn test_zone_tree_nests_children() {
        let items = [SocketDecl::new("Geometry", SocketType::Geometry)];
        let mut tree = NodeTree::new("Sim", TreeInterface::default());
        let o1 = tree.add_simulation_output("Outer Out", &items);
        let i1 = tree.add_simulation_input("Outer In", &items, Some(o1)).unwrap();
        let o2 = tree.add_simulation_output("Inner Out", &items);
        let i2 = tree.add_simulation_input("Inner In", &items, Some(o2)).unwrap();
        tree.connect(i1, 0, i2, 0).unwrap();
        tree.connect(i2, 0, o2, 0).unwrap();
        tree.connect(o2, 0, o1, 0).unwrap();

        let forest = tree.zones().unwrap();
        let text = format_zone_tree(&tree, &forest);
        assert!(text.contains("|-- [Z0] 'Outer In' .. 'Outer Out' (depth 0)"), "Text:\n{}", text);
        assert!(text.contains("|   |-- Nodes: Inner Out, Inner In"), "Text:\n{}", text);
        assert!(text.contains("|   `-- [Z1] 'Inner In' .. 'Inner Out' (depth 1)"), "Text:\n{}", text);
        assert!(text.contains("`-- Outside zones: Outer Out, Outer In"), "Text:\n{}", text);
    }
}
