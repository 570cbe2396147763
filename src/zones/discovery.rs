//! discovery.rs
//! Finds the zones of a tree, how they nest and which nodes they contain.

use super::forest::{Zone, ZoneForest};
use crate::analysis::topology::{self, ZoneEdges};
use crate::bits::BitGroupVector;
use crate::graph::NodeTree;
use crate::store::{LinkId, NodeId, NodeKind, SocketId};
use log::{debug, warn};

/// Builds the zone forest of `tree`.
///
/// Returns `None` when the tree has a cycle or the zones are not properly
/// nested (a node both inside and after a zone, a zone with two parents).
pub fn discover_zones(tree: &NodeTree) -> Option<ZoneForest> {
    let order = match topology::sort(tree, ZoneEdges::Include) {
        Ok(order) => order,
        Err(err) => {
            warn!("Skipping zone discovery of '{}': {}", tree.name(), err);
            return None;
        }
    };

    // 1. One zone per output marker, input markers attach to their partner
    let (mut zones, zone_by_anchor) = create_zones(tree);

    // 2. Which zones every node is inside of, or after
    let depends_on_input = zone_dependencies(tree, &order, &zones, &zone_by_anchor)?;

    // 3. Direct nesting
    let relations = direct_parent_relations(&zones, &depends_on_input);
    for &(parent, child) in &relations {
        if zones[child].parent_zone.is_some() {
            warn!("Zone {} of '{}' is nested in more than one zone", child, tree.name());
            return None;
        }
        zones[child].parent_zone = Some(parent);
        zones[parent].child_zones.push(child);
    }
    assign_depths(&mut zones, tree)?;

    // 4. Node membership
    let mut forest = ZoneForest {
        root_zones: zones.iter().filter(|z| z.parent_zone.is_none()).map(|z| z.index).collect(),
        zones,
        ..Default::default()
    };
    for node in tree.node_ids() {
        match innermost_zone(&forest.zones, &depends_on_input, node, zone_by_anchor[node.index()]) {
            Some(zone) => {
                forest.zone_by_node.insert(tree.meta(node).identifier, zone);
                forest.zones[zone].child_nodes.push(node);
            }
            None => forest.root_nodes.push(node),
        }
    }

    // 5. Links crossing zone borders
    for (zone, link) in border_links(tree, &forest) {
        forest.zones[zone].border_links.push(link);
    }

    debug!(
        "Zone discovery of '{}': {} zones, {} root zones, {} root nodes",
        tree.name(),
        forest.zones.len(),
        forest.root_zones.len(),
        forest.root_nodes.len()
    );
    Some(forest)
}

/// Returns the zones and, per node, the zone it is an anchor of.
fn create_zones(tree: &NodeTree) -> (Vec<Zone>, Vec<Option<usize>>) {
    let mut zones = Vec::new();
    let mut zone_by_anchor = vec![None; tree.node_count()];

    for node in tree.node_ids() {
        if matches!(tree.kind(node), NodeKind::SimulationOutput) {
            zone_by_anchor[node.index()] = Some(zones.len());
            zones.push(Zone::new(zones.len(), node));
        }
    }
    for node in tree.node_ids() {
        let NodeKind::SimulationInput { output_node: Some(identifier) } = tree.kind(node) else {
            continue;
        };
        let Some(output) = tree.node_by_identifier(*identifier) else {
            continue;
        };
        let Some(zone) = zone_by_anchor[output.index()] else {
            continue;
        };
        if zones[zone].input_node.is_some() {
            warn!("Zone output '{}' already has an input marker", tree.meta(output).name);
            continue;
        }
        zones[zone].input_node = Some(node);
        zone_by_anchor[node.index()] = Some(zone);
    }
    (zones, zone_by_anchor)
}

/// Bit `z` of row `n` is set when node `n` is inside zone `z` (downstream of
/// its input marker, not past its output marker). `None` on contradiction.
fn zone_dependencies(
    tree: &NodeTree,
    order: &[NodeId],
    zones: &[Zone],
    zone_by_anchor: &[Option<usize>],
) -> Option<BitGroupVector> {
    let mut depends_on_input = BitGroupVector::new(tree.node_count(), zones.len(), false);
    let mut depends_on_output = BitGroupVector::new(tree.node_count(), zones.len(), false);

    for &node in order {
        let n = node.index();
        for input in tree.inputs(node) {
            for link in tree.used_links_of(input) {
                let from = link.from_node.index();
                depends_on_input.or_groups(n, from);
                depends_on_output.or_groups(n, from);
            }
        }
        if let Some(zone_index) = zone_by_anchor[n] {
            let zone = &zones[zone_index];
            if zone.input_node == Some(node) {
                depends_on_input.set(n, zone_index);
            } else {
                // Implicitly linked to the input marker.
                if let Some(input) = zone.input_node {
                    depends_on_input.or_groups(n, input.index());
                    depends_on_output.or_groups(n, input.index());
                }
                depends_on_input.reset(n, zone_index);
                depends_on_output.set(n, zone_index);
            }
        }
        if depends_on_input.has_common_set_bits(n, &depends_on_output, n) {
            warn!(
                "Node '{}' of '{}' is both inside and after the same zone",
                tree.meta(node).name,
                tree.name()
            );
            return None;
        }
    }
    Some(depends_on_input)
}

/// (parent, child) pairs without the ones implied through an intermediate zone.
fn direct_parent_relations(zones: &[Zone], depends_on_input: &BitGroupVector) -> Vec<(usize, usize)> {
    let mut relations = Vec::new();
    for zone in zones {
        let Some(output) = zone.output_node else { continue };
        for parent in depends_on_input.iter_ones(output.index()) {
            if parent != zone.index {
                relations.push((parent, zone.index));
            }
        }
    }
    // Brute force, zone counts are small.
    relations
        .iter()
        .copied()
        .filter(|&(parent, child)| {
            !relations
                .iter()
                .any(|&(from, middle)| from == parent && middle != child && relations.contains(&(middle, child)))
        })
        .collect()
}

fn assign_depths(zones: &mut [Zone], tree: &NodeTree) -> Option<()> {
    let mut depths: Vec<Option<usize>> = vec![None; zones.len()];
    for start in 0..zones.len() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            if depths[index].is_some() {
                break;
            }
            if chain.contains(&index) {
                warn!("Zones of '{}' have cyclic parents", tree.name());
                return None;
            }
            chain.push(index);
            current = zones[index].parent_zone;
        }
        let mut depth = current.and_then(|index| depths[index]).map_or(0, |d| d + 1);
        for &index in chain.iter().rev() {
            depths[index] = Some(depth);
            depth += 1;
        }
    }
    for (zone, depth) in zones.iter_mut().zip(depths) {
        zone.depth = depth.unwrap_or_default();
    }
    Some(())
}

/// Deepest zone the node is inside of. Equal depths go to the lowest index.
fn innermost_zone(
    zones: &[Zone],
    depends_on_input: &BitGroupVector,
    node: NodeId,
    own_zone: Option<usize>,
) -> Option<usize> {
    depends_on_input
        .iter_ones(node.index())
        .filter(|&zone| Some(zone) != own_zone)
        .fold(None, |best, zone| match best {
            Some(b) if zones[b].depth >= zones[zone].depth => Some(b),
            _ => Some(zone),
        })
}

/// Each used link crossing into a zone is recorded on every zone from the
/// link's target zone up to, not including, its source zone.
fn border_links(tree: &NodeTree, forest: &ZoneForest) -> Vec<(usize, LinkId)> {
    let mut found = Vec::new();
    let zone_of = |socket: SocketId| forest.get_zone_by_socket(tree, socket).map(|zone| zone.index);

    for (id, link) in tree.links() {
        if !tree.is_link_used(id) {
            continue;
        }
        let from_zone = zone_of(link.from_socket);
        let to_zone = zone_of(link.to_socket);
        if from_zone == to_zone {
            continue;
        }
        let mut current = to_zone;
        while let Some(zone) = current {
            if Some(zone) == from_zone {
                break;
            }
            found.push((zone, id));
            current = forest.zones[zone].parent_zone;
        }
    }
    found
}
