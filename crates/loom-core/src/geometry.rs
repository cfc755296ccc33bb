//! Node and group bounding boxes.
//!
//! A node without a measured size gets a heuristic one. The heuristic must
//! match what the host renders before measurement, otherwise a node visibly
//! jumps when its real height is written back.

use crate::config::CanvasConfig;
use crate::model::*;
use winnow::combinator::separated_pair;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

pub const DEFAULT_NODE_WIDTH: f32 = 420.0;

/// Height of text/analysis style nodes (prompt input, analyzer, editor).
pub const TEXT_NODE_HEIGHT: f32 = 360.0;

pub const AUDIO_NODE_HEIGHT: f32 = 200.0;

/// Extra control row shown by a video generator in cut mode.
pub const CUT_MODE_EXTRA_HEIGHT: f32 = 36.0;

const FALLBACK_RATIO: (f32, f32) = (16.0, 9.0);

/// World-space bounding box of a node.
pub fn bounds_of(node: &Node) -> Bounds {
    let width = node.width.unwrap_or(DEFAULT_NODE_WIDTH);
    let height = node
        .height
        .unwrap_or_else(|| heuristic_height(&node.data, width));
    Bounds::new(node.x, node.y, width, height)
}

fn heuristic_height(data: &NodeData, width: f32) -> f32 {
    match data.node_type() {
        NodeType::PromptInput | NodeType::VideoAnalyzer | NodeType::ImageEditor => {
            TEXT_NODE_HEIGHT
        }
        NodeType::AudioGenerator => AUDIO_NODE_HEIGHT,
        NodeType::ImageGenerator | NodeType::VideoGenerator | NodeType::StoryGenerator => {
            let (w, h) = data
                .aspect_ratio()
                .and_then(parse_aspect_ratio)
                .unwrap_or(FALLBACK_RATIO);
            let mut height = width * h / w;
            if data.is_cut_mode() {
                height += CUT_MODE_EXTRA_HEIGHT;
            }
            height
        }
    }
}

pub fn group_bounds(group: &Group) -> Bounds {
    group.bounds()
}

/// Union of all node bounds, or `None` for an empty slice.
pub fn content_bounds(nodes: &[Node]) -> Option<Bounds> {
    nodes
        .iter()
        .map(bounds_of)
        .reduce(|acc, b| acc.union(&b))
}

/// Apply the resize floor.
pub fn resize_floor(width: f32, height: f32, config: &CanvasConfig) -> (f32, f32) {
    (
        width.max(config.min_node_width),
        height.max(config.min_node_height),
    )
}

// ─── Aspect ratio parsing ────────────────────────────────────────────────

/// Parse `"W:H"` (e.g. `"16:9"`, `"2.39:1"`). Zero or malformed terms yield
/// `None`.
pub fn parse_aspect_ratio(input: &str) -> Option<(f32, f32)> {
    let (w, h) = separated_pair(ratio_term, ':', ratio_term)
        .parse(input.trim())
        .ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

fn ratio_term(input: &mut &str) -> ModalResult<f32> {
    let digits: &str =
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.').parse_next(input)?;
    digits
        .parse::<f32>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}
