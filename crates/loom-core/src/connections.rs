//! Connection graph: directed edges between nodes plus each node's ordered
//! `inputs` list.
//!
//! Invariant: every connection references two existing nodes and appears at
//! most once. `inputs` is seeded by `connect` and afterwards only reordered
//! by the user and is never re-derived from connection order.
//!
//! Cycles are allowed. Nothing here walks the graph transitively.

use crate::id::NodeId;
use crate::model::{Connection, Node, Scene};

impl Scene {
    /// Add the edge `from → to`. Returns `false` (no-op) for a self edge, a
    /// duplicate pair, or a missing endpoint.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
        if from == to || self.has_connection(from, to) {
            return false;
        }
        if !self.contains_node(from) {
            return false;
        }
        let Some(target) = self.node_mut(to) else {
            return false;
        };
        if !target.inputs.contains(&from) {
            target.inputs.push(from);
        }
        self.connections.push(Connection::new(from, to));
        true
    }

    /// Remove the edge `from → to` and the matching input slot.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| !(c.from == from && c.to == to));
        if self.connections.len() == before {
            return false;
        }
        if let Some(target) = self.node_mut(to) {
            target.inputs.retain(|i| *i != from);
        }
        true
    }

    pub fn has_connection(&self, from: NodeId, to: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.from == from && c.to == to)
    }

    /// Delete a node and cascade: every edge touching it and every `inputs`
    /// entry naming it are removed.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.node_index(id)?;
        let removed = self.nodes.remove(idx);
        self.connections.retain(|c| !c.touches(id));
        for node in &mut self.nodes {
            node.inputs.retain(|i| *i != id);
        }
        Some(removed)
    }

    /// Move input slot `from` to position `to` on `node`.
    pub fn reorder_input(&mut self, node: NodeId, from: usize, to: usize) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        if from >= n.inputs.len() || to >= n.inputs.len() || from == to {
            return false;
        }
        let moved = n.inputs.remove(from);
        n.inputs.insert(to, moved);
        true
    }

    /// Connections whose endpoints both exist. Render and query paths use
    /// this instead of trusting `connections` blindly.
    pub fn live_connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections
            .iter()
            .filter(|c| self.contains_node(c.from) && self.contains_node(c.to))
    }

    /// Upstream nodes of `id` in input-slot order, skipping stale ids.
    pub fn inputs_of(&self, id: NodeId) -> Vec<&Node> {
        self.node(id)
            .map(|n| n.inputs.iter().filter_map(|i| self.node(*i)).collect())
            .unwrap_or_default()
    }

    /// Ids of nodes fed by `id`.
    pub fn downstream_of(&self, id: NodeId) -> Vec<NodeId> {
        self.live_connections()
            .filter(|c| c.from == id)
            .map(|c| c.to)
            .collect()
    }

    /// Drop duplicate or dangling connections and stale input ids. Used
    /// after loading data from outside.
    pub fn sweep_dangling(&mut self) {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        let mut seen: Vec<Connection> = Vec::with_capacity(self.connections.len());
        self.connections.retain(|c| {
            let keep = c.from != c.to
                && ids.contains(&c.from)
                && ids.contains(&c.to)
                && !seen.contains(c);
            if keep {
                seen.push(*c);
            }
            keep
        });
        for node in &mut self.nodes {
            node.inputs.retain(|i| ids.contains(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::id::NodeId;
    use crate::model::{Node, NodeType, Scene};
    use pretty_assertions::assert_eq;

    fn scene_with(names: &[&str]) -> (Scene, Vec<NodeId>) {
        let mut scene = Scene::new();
        let ids: Vec<NodeId> = names.iter().map(|n| NodeId::intern(n)).collect();
        for (i, id) in ids.iter().enumerate() {
            scene.add_node(Node::new(*id, NodeType::ImageGenerator, i as f32 * 500.0, 0.0));
        }
        (scene, ids)
    }

    #[test]
    fn connect_is_idempotent() {
        let (mut scene, ids) = scene_with(&["c_a", "c_b"]);
        assert!(scene.connect(ids[0], ids[1]));
        assert!(!scene.connect(ids[0], ids[1]));
        assert_eq!(scene.connections.len(), 1);
        assert_eq!(scene.node(ids[1]).unwrap().inputs.as_slice(), &[ids[0]]);
    }

    #[test]
    fn connect_rejects_self_and_missing() {
        let (mut scene, ids) = scene_with(&["c_self"]);
        assert!(!scene.connect(ids[0], ids[0]));
        assert!(!scene.connect(ids[0], NodeId::intern("c_ghost")));
        assert!(!scene.connect(NodeId::intern("c_ghost"), ids[0]));
        assert!(scene.connections.is_empty());
    }

    #[test]
    fn remove_node_cascades() {
        let (mut scene, ids) = scene_with(&["r_a", "r_b", "r_c"]);
        scene.connect(ids[0], ids[1]);
        scene.connect(ids[1], ids[2]);
        scene.connect(ids[0], ids[2]);

        scene.remove_node(ids[0]).unwrap();

        assert!(scene.connections.iter().all(|c| !c.touches(ids[0])));
        assert!(scene.nodes.iter().all(|n| !n.inputs.contains(&ids[0])));
        assert_eq!(scene.node(ids[2]).unwrap().inputs.as_slice(), &[ids[1]]);
        assert!(scene.remove_node(ids[0]).is_none());
    }

    #[test]
    fn disconnect_clears_input_slot() {
        let (mut scene, ids) = scene_with(&["d_a", "d_b"]);
        scene.connect(ids[0], ids[1]);
        assert!(scene.disconnect(ids[0], ids[1]));
        assert!(!scene.disconnect(ids[0], ids[1]));
        assert!(scene.node(ids[1]).unwrap().inputs.is_empty());
    }

    #[test]
    fn reorder_inputs_is_independent_of_connection_order() {
        let (mut scene, ids) = scene_with(&["o_a", "o_b", "o_c", "o_t"]);
        scene.connect(ids[0], ids[3]);
        scene.connect(ids[1], ids[3]);
        scene.connect(ids[2], ids[3]);
        assert!(scene.reorder_input(ids[3], 2, 0));
        assert_eq!(
            scene.node(ids[3]).unwrap().inputs.as_slice(),
            &[ids[2], ids[0], ids[1]]
        );
        assert!(!scene.reorder_input(ids[3], 5, 0));

        let upstream: Vec<NodeId> = scene.inputs_of(ids[3]).iter().map(|n| n.id).collect();
        assert_eq!(upstream, vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn cycles_are_permitted() {
        let (mut scene, ids) = scene_with(&["cy_a", "cy_b"]);
        assert!(scene.connect(ids[0], ids[1]));
        assert!(scene.connect(ids[1], ids[0]));
        assert_eq!(scene.downstream_of(ids[0]), vec![ids[1]]);
    }

    #[test]
    fn sweep_removes_dangling_and_duplicates() {
        let (mut scene, ids) = scene_with(&["s_a", "s_b"]);
        let ghost = NodeId::intern("s_ghost");
        scene.connections.push(crate::model::Connection::new(ids[0], ids[1]));
        scene.connections.push(crate::model::Connection::new(ids[0], ids[1]));
        scene.connections.push(crate::model::Connection::new(ghost, ids[1]));
        scene.node_mut(ids[1]).unwrap().inputs.push(ghost);

        assert_eq!(scene.live_connections().count(), 2);
        scene.sweep_dangling();
        assert_eq!(scene.connections.len(), 1);
        assert!(scene.node(ids[1]).unwrap().inputs.is_empty());
    }
}
