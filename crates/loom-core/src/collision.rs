//! Post-drop overlap resolution.
//!
//! Runs once when a dragged node is released. The dropped rectangle is
//! tested against every other node in array order; on overlap it is pushed
//! out along whichever of the four directions needs the least displacement,
//! leaving `collision_padding` between the two. The pushed rectangle is then
//! tested against the remaining nodes.
//!
//! This is one sequential sweep, not a relaxation to a fixed point: a push
//! can land the node on a neighbour that was already checked, and that
//! residual overlap is left as is.

use crate::config::CanvasConfig;
use crate::id::NodeId;
use crate::model::Bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionOutcome {
    pub bounds: Bounds,
    /// Nodes the dropped rectangle was pushed off, in sweep order.
    pub pushed_by: Vec<(NodeId, PushDirection)>,
}

impl CollisionOutcome {
    pub fn moved(&self) -> bool {
        !self.pushed_by.is_empty()
    }
}

/// Resolve overlap of `dropped` against `others` (the dropped node itself
/// excluded).
pub fn resolve_collisions(
    dropped: Bounds,
    others: &[(NodeId, Bounds)],
    config: &CanvasConfig,
) -> CollisionOutcome {
    let pad = config.collision_padding;
    let mut bounds = dropped;
    let mut pushed_by = Vec::new();

    for (id, other) in others {
        if !bounds.intersects(other) {
            continue;
        }
        let direction = least_displacement(&bounds, other);
        match direction {
            PushDirection::Left => bounds.x = other.x - bounds.width - pad,
            PushDirection::Right => bounds.x = other.right() + pad,
            PushDirection::Up => bounds.y = other.y - bounds.height - pad,
            PushDirection::Down => bounds.y = other.bottom() + pad,
        }
        log::debug!("collision: pushed {direction:?} off {id}");
        pushed_by.push((*id, direction));
    }

    CollisionOutcome { bounds, pushed_by }
}

/// Direction with the smallest overlap magnitude. Ties keep the earlier of
/// left, right, up, down.
fn least_displacement(a: &Bounds, b: &Bounds) -> PushDirection {
    let candidates = [
        (PushDirection::Left, a.right() - b.x),
        (PushDirection::Right, b.right() - a.x),
        (PushDirection::Up, a.bottom() - b.y),
        (PushDirection::Down, b.bottom() - a.y),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 < best.1 {
            best = *candidate;
        }
    }
    best.0
}
