//! Hit testing: world point → canvas target.
//!
//! Walks nodes in reverse array order (last painted = topmost). For each
//! node the ports and resize handle are checked before the body, since they
//! sit on the node's edge. Groups are painted under all nodes and are only
//! hit when no node is.

use crate::config::CanvasConfig;
use crate::geometry::bounds_of;
use crate::id::{GroupId, NodeId};
use crate::model::{Bounds, Node, Point, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Port { node: NodeId, side: PortSide },
    ResizeHandle(NodeId),
    Node(NodeId),
    Group(GroupId),
}

impl HitTarget {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            HitTarget::Port { node, .. } => Some(*node),
            HitTarget::ResizeHandle(id) | HitTarget::Node(id) => Some(*id),
            HitTarget::Group(_) => None,
        }
    }
}

/// Port anchor in world space. Ports sit on the vertical center of the
/// left (input) and right (output) edges.
pub fn port_position(node: &Node, side: PortSide) -> Point {
    let b = bounds_of(node);
    let cy = b.y + b.height / 2.0;
    match side {
        PortSide::Input => Point::new(b.x, cy),
        PortSide::Output => Point::new(b.right(), cy),
    }
}

/// Find the topmost target at world position `p`. Screen-sized tolerances
/// are divided by `scale`.
pub fn hit_test(scene: &Scene, p: Point, scale: f32, config: &CanvasConfig) -> Option<HitTarget> {
    let radius = config.port_hit_radius / scale;
    let handle = config.resize_handle_size / scale;

    for node in scene.nodes.iter().rev() {
        for side in [PortSide::Output, PortSide::Input] {
            let port = port_position(node, side);
            let (dx, dy) = (p.x - port.x, p.y - port.y);
            if dx * dx + dy * dy <= radius * radius {
                return Some(HitTarget::Port {
                    node: node.id,
                    side,
                });
            }
        }

        let b = bounds_of(node);
        if !b.contains(p) {
            continue;
        }
        let handle_rect = Bounds::new(b.right() - handle, b.bottom() - handle, handle, handle);
        if handle_rect.contains(p) {
            return Some(HitTarget::ResizeHandle(node.id));
        }
        return Some(HitTarget::Node(node.id));
    }

    scene
        .groups
        .iter()
        .rev()
        .find(|g| g.bounds().contains(p))
        .map(|g| HitTarget::Group(g.id))
}
