//! registry.rs
//! Dense columnar storage for nodes, sockets and links.
//! Sockets of a node are contiguous (inputs first, then outputs), so a node
//! only stores two `(start, count)` ranges. Links hang off their sockets in
//! intrusive singly linked lists.

use super::error::TreeError;
use super::types::*;
use std::collections::HashMap;

const NO_LINK: u32 = u32::MAX;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar node arrays
    pub kinds: Vec<NodeKind>,
    pub meta: Vec<NodeMetadata>,
    pub inputs_ranges: Vec<(u32, u32)>,
    pub outputs_ranges: Vec<(u32, u32)>,

    pub sockets: Vec<Socket>,

    // Links. Removed links keep their slot so that `LinkId`s stay stable.
    pub links: Vec<Link>,
    pub link_alive: Vec<bool>,

    // Per-socket link chains (one chain per socket, head in `first_link`).
    pub first_link: Vec<u32>,
    pub next_from_link: Vec<u32>,
    pub next_to_link: Vec<u32>,

    pub interface: TreeInterface,

    next_identifier: u32,
    node_by_identifier: HashMap<u32, NodeId>,
}

impl Registry {
    pub fn new(interface: TreeInterface) -> Self {
        Self { interface, ..Default::default() }
    }

    pub fn count(&self) -> usize { self.kinds.len() }
    pub fn socket_count(&self) -> usize { self.sockets.len() }
    pub fn link_count(&self) -> usize { self.links.len() }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        inputs: &[SocketDecl],
        outputs: &[SocketDecl],
    ) -> NodeId {
        let id = NodeId::new(self.kinds.len());

        // 1. Sockets (contiguous block)
        let inputs_start = self.sockets.len() as u32;
        self.push_sockets(id, SocketDirection::Input, inputs);
        let outputs_start = self.sockets.len() as u32;
        self.push_sockets(id, SocketDirection::Output, outputs);
        self.inputs_ranges.push((inputs_start, inputs.len() as u32));
        self.outputs_ranges.push((outputs_start, outputs.len() as u32));

        // 2. Metadata
        let identifier = self.next_identifier;
        self.next_identifier += 1;
        self.node_by_identifier.insert(identifier, id);
        self.kinds.push(kind);
        self.meta.push(NodeMetadata { name: name.into(), identifier });

        id
    }

    fn push_sockets(&mut self, node: NodeId, direction: SocketDirection, decls: &[SocketDecl]) {
        for (index_in_node, decl) in decls.iter().enumerate() {
            self.sockets.push(Socket {
                node,
                direction,
                index_in_node,
                ty: decl.ty,
                shape: decl.resolved_shape(),
                name: decl.name.clone(),
                available: true,
            });
            self.first_link.push(NO_LINK);
        }
    }

    pub fn add_link(&mut self, from: SocketId, to: SocketId) -> Result<LinkId, TreeError> {
        let from_sock = self.sockets.get(from.index()).ok_or(TreeError::UnknownSocket(from))?;
        let to_sock = self.sockets.get(to.index()).ok_or(TreeError::UnknownSocket(to))?;
        if !from_sock.is_output() || !to_sock.is_input() {
            return Err(TreeError::LinkDirection);
        }
        let (from_node, to_node) = (from_sock.node, to_sock.node);
        if from_node == to_node {
            return Err(TreeError::SelfLink(self.meta[from_node.index()].name.clone()));
        }

        let id = LinkId::new(self.links.len());
        self.links.push(Link {
            from_node,
            from_socket: from,
            to_node,
            to_socket: to,
            muted: false,
        });
        self.link_alive.push(true);

        // Prepend to both chains
        self.next_from_link.push(self.first_link[from.index()]);
        self.first_link[from.index()] = id.0;
        self.next_to_link.push(self.first_link[to.index()]);
        self.first_link[to.index()] = id.0;

        Ok(id)
    }

    pub fn remove_link(&mut self, id: LinkId) -> Result<(), TreeError> {
        if !self.is_link_alive(id) {
            return Err(TreeError::UnknownLink(id));
        }
        let (from, to) = (self.links[id.index()].from_socket, self.links[id.index()].to_socket);
        Self::unlink(&mut self.first_link, &mut self.next_from_link, from, id);
        Self::unlink(&mut self.first_link, &mut self.next_to_link, to, id);
        self.link_alive[id.index()] = false;
        Ok(())
    }

    fn unlink(first: &mut [u32], next: &mut [u32], socket: SocketId, id: LinkId) {
        let head = &mut first[socket.index()];
        if *head == id.0 {
            *head = next[id.index()];
            return;
        }
        let mut cursor = *head;
        while cursor != NO_LINK {
            let following = next[cursor as usize];
            if following == id.0 {
                next[cursor as usize] = next[id.index()];
                return;
            }
            cursor = following;
        }
    }

    pub fn set_link_muted(&mut self, id: LinkId, muted: bool) -> Result<(), TreeError> {
        if !self.is_link_alive(id) {
            return Err(TreeError::UnknownLink(id));
        }
        self.links[id.index()].muted = muted;
        Ok(())
    }

    pub fn set_socket_available(&mut self, id: SocketId, available: bool) -> Result<(), TreeError> {
        let socket = self.sockets.get_mut(id.index()).ok_or(TreeError::UnknownSocket(id))?;
        socket.available = available;
        Ok(())
    }

    pub fn set_simulation_partner(&mut self, input: NodeId, output: Option<NodeId>) -> Result<(), TreeError> {
        if input.index() >= self.count() {
            return Err(TreeError::UnknownNode(input));
        }
        let partner = match output {
            Some(out) => {
                let kind = self.kinds.get(out.index()).ok_or(TreeError::UnknownNode(out))?;
                if !matches!(kind, NodeKind::SimulationOutput) {
                    return Err(TreeError::NotSimulationOutput(self.meta[out.index()].name.clone()));
                }
                Some(self.meta[out.index()].identifier)
            }
            None => None,
        };
        match &mut self.kinds[input.index()] {
            NodeKind::SimulationInput { output_node } => {
                *output_node = partner;
                Ok(())
            }
            _ => Err(TreeError::NotSimulationInput(self.meta[input.index()].name.clone())),
        }
    }

    // --- Accessors ---

    #[inline(always)]
    pub fn inputs(&self, node: NodeId) -> impl ExactSizeIterator<Item = SocketId> {
        let (start, count) = self.inputs_ranges[node.index()];
        (start..start + count).map(SocketId)
    }

    #[inline(always)]
    pub fn outputs(&self, node: NodeId) -> impl ExactSizeIterator<Item = SocketId> {
        let (start, count) = self.outputs_ranges[node.index()];
        (start..start + count).map(SocketId)
    }

    pub fn input(&self, node: NodeId, index: usize) -> Option<SocketId> {
        let (start, count) = *self.inputs_ranges.get(node.index())?;
        (index < count as usize).then(|| SocketId(start + index as u32))
    }

    pub fn output(&self, node: NodeId, index: usize) -> Option<SocketId> {
        let (start, count) = *self.outputs_ranges.get(node.index())?;
        (index < count as usize).then(|| SocketId(start + index as u32))
    }

    pub fn is_link_alive(&self, id: LinkId) -> bool {
        self.link_alive.get(id.index()).copied().unwrap_or(false)
    }

    /// Links attached to a socket: outgoing for outputs, incoming for inputs.
    pub fn links_of(&self, socket: SocketId) -> SocketLinks<'_> {
        let next = if self.sockets[socket.index()].is_output() {
            &self.next_from_link
        } else {
            &self.next_to_link
        };
        SocketLinks { next, cursor: self.first_link[socket.index()] }
    }

    pub fn alive_links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter(|(i, _)| self.link_alive[*i])
            .map(|(i, link)| (LinkId::new(i), link))
    }

    pub fn is_link_available(&self, link: &Link) -> bool {
        self.sockets[link.from_socket.index()].available && self.sockets[link.to_socket.index()].available
    }

    /// Available and not muted.
    pub fn is_link_used(&self, link: &Link) -> bool {
        !link.muted && self.is_link_available(link)
    }

    pub fn node_by_identifier(&self, identifier: u32) -> Option<NodeId> {
        self.node_by_identifier.get(&identifier).copied()
    }
}

pub struct SocketLinks<'a> {
    next: &'a [u32],
    cursor: u32,
}

impl Iterator for SocketLinks<'_> {
    type Item = LinkId;

    fn next(&mut self) -> Option<LinkId> {
        if self.cursor == NO_LINK {
            return None;
        }
        let id = LinkId(self.cursor);
        self.cursor = self.next[id.index()];
        Some(id)
    }
}
