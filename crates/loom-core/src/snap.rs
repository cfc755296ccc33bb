//! Live alignment snapping while a node is dragged.
//!
//! Each axis is handled independently. Other nodes are visited in array
//! order and, per node, five rules are tried in a fixed order:
//!
//! 1. start ≈ other start
//! 2. start ≈ other end
//! 3. end ≈ other start
//! 4. end ≈ other end
//! 5. center ≈ other center
//!
//! The first node/rule pair within the threshold wins and ends the search
//! for that axis. There is no search for the closest target.

use crate::config::CanvasConfig;
use crate::model::Bounds;

/// Outcome of a snap pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The proposed rectangle, moved onto any snap target.
    pub bounds: Bounds,
    /// World x of the vertical guide line, when the x axis snapped.
    pub guide_x: Option<f32>,
    /// World y of the horizontal guide line, when the y axis snapped.
    pub guide_y: Option<f32>,
}

impl SnapResult {
    pub fn snapped(&self) -> bool {
        self.guide_x.is_some() || self.guide_y.is_some()
    }
}

/// Snap `proposed` against `others` (which must not include the dragged
/// node itself). The threshold is converted from screen pixels to world
/// units with the current `scale`.
pub fn snap_bounds(
    proposed: Bounds,
    others: &[Bounds],
    scale: f32,
    config: &CanvasConfig,
) -> SnapResult {
    let threshold = config.snap_threshold_px / scale;
    let mut bounds = proposed;

    let x = snap_axis(
        proposed.x,
        proposed.width,
        others.iter().map(|o| (o.x, o.width)),
        threshold,
    );
    if let Some((start, _)) = x {
        bounds.x = start;
    }

    let y = snap_axis(
        proposed.y,
        proposed.height,
        others.iter().map(|o| (o.y, o.height)),
        threshold,
    );
    if let Some((start, _)) = y {
        bounds.y = start;
    }

    SnapResult {
        bounds,
        guide_x: x.map(|(_, guide)| guide),
        guide_y: y.map(|(_, guide)| guide),
    }
}

/// Returns `(new_start, guide)` for the first matching rule.
fn snap_axis(
    start: f32,
    size: f32,
    others: impl Iterator<Item = (f32, f32)>,
    threshold: f32,
) -> Option<(f32, f32)> {
    let end = start + size;
    let mid = start + size / 2.0;

    for (o_start, o_size) in others {
        let o_end = o_start + o_size;
        let o_mid = o_start + o_size / 2.0;

        // (dragged edge, target line, resulting start)
        let rules = [
            (start, o_start, o_start),
            (start, o_end, o_end),
            (end, o_start, o_start - size),
            (end, o_end, o_end - size),
            (mid, o_mid, o_mid - size / 2.0),
        ];
        for (edge, line, new_start) in rules {
            if (edge - line).abs() < threshold {
                return Some((new_start, line));
            }
        }
    }
    None
}
