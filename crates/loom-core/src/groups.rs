//! Derived group membership.
//!
//! A group stores only its rectangle. A node belongs to a group when the
//! center of its bounds lies strictly inside the group rectangle; this is
//! recomputed on every query so nodes move in and out with no bookkeeping.

use crate::geometry::bounds_of;
use crate::id::{GroupId, NodeId};
use crate::model::{Bounds, Group, Node, Scene};

pub fn is_member(group: &Group, node: &Node) -> bool {
    group.bounds().contains_strict(bounds_of(node).center())
}

/// Ids of every node currently inside `group`, in node array order.
pub fn members_of(scene: &Scene, group: &Group) -> Vec<NodeId> {
    scene
        .nodes
        .iter()
        .filter(|n| is_member(group, n))
        .map(|n| n.id)
        .collect()
}

/// First group (array order) containing the node.
pub fn group_of(scene: &Scene, node: &Node) -> Option<GroupId> {
    scene
        .groups
        .iter()
        .find(|g| is_member(g, node))
        .map(|g| g.id)
}

/// The subset of `ids` not inside any existing group.
pub fn free_nodes(scene: &Scene, ids: &[NodeId]) -> Vec<NodeId> {
    ids.iter()
        .copied()
        .filter(|id| {
            scene
                .node(*id)
                .is_some_and(|n| group_of(scene, n).is_none())
        })
        .collect()
}

/// Nodes whose center lies inside a world-space rectangle (marquee query).
pub fn nodes_with_center_in(scene: &Scene, rect: Bounds) -> Vec<NodeId> {
    scene
        .nodes
        .iter()
        .filter(|n| rect.contains(bounds_of(n).center()))
        .map(|n| n.id)
        .collect()
}

/// Bounding box of the given nodes grown by `padding`. `None` when none of
/// the ids resolve.
pub fn auto_group_bounds(scene: &Scene, ids: &[NodeId], padding: f32) -> Option<Bounds> {
    ids.iter()
        .filter_map(|id| scene.node(*id))
        .map(bounds_of)
        .reduce(|acc, b| acc.union(&b))
        .map(|b| b.expand(padding))
}
