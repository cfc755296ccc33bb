//! Core scene-graph data model for the Loom canvas.
//!
//! The scene is three flat collections: nodes (typed units of work with a
//! position), connections (directed `from → to` edges) and groups (plain
//! rectangles). Array order is meaningful: it is the paint order and the
//! iteration order of snapping and collision resolution. Group membership is
//! never stored; see [`crate::groups`].

use crate::id::{GroupId, NodeId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Node types & status ─────────────────────────────────────────────────

/// The closed set of pipeline node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    PromptInput,
    ImageGenerator,
    VideoGenerator,
    AudioGenerator,
    VideoAnalyzer,
    ImageEditor,
    StoryGenerator,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::PromptInput,
        NodeType::ImageGenerator,
        NodeType::VideoGenerator,
        NodeType::AudioGenerator,
        NodeType::VideoAnalyzer,
        NodeType::ImageEditor,
        NodeType::StoryGenerator,
    ];

    /// Title given to freshly created nodes.
    pub fn default_title(self) -> &'static str {
        match self {
            NodeType::PromptInput => "Prompt",
            NodeType::ImageGenerator => "Image",
            NodeType::VideoGenerator => "Video",
            NodeType::AudioGenerator => "Audio",
            NodeType::VideoAnalyzer => "Video Analysis",
            NodeType::ImageEditor => "Image Editor",
            NodeType::StoryGenerator => "Storyboard",
        }
    }

    /// Kebab-case wire name (`"image-generator"`).
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::PromptInput => "prompt-input",
            NodeType::ImageGenerator => "image-generator",
            NodeType::VideoGenerator => "video-generator",
            NodeType::AudioGenerator => "audio-generator",
            NodeType::VideoAnalyzer => "video-analyzer",
            NodeType::ImageEditor => "image-editor",
            NodeType::StoryGenerator => "story-generator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Lifecycle of a node's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    #[default]
    Idle,
    Working,
    Success,
    Error,
}

// ─── Payloads ────────────────────────────────────────────────────────────

/// Reference to a generated media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
}

impl MediaRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime: None,
        }
    }
}

/// One planned scene of a storyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryScene {
    pub title: String,
    pub description: String,
}

/// Video generation mode. `Cut` adds an extra control row to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoMode {
    #[default]
    Standard,
    Cut,
}

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromptData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenData {
    pub prompt: String,
    pub aspect_ratio: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Default for ImageGenData {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            model: None,
            images: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGenData {
    pub prompt: String,
    pub aspect_ratio: String,
    #[serde(default)]
    pub mode: VideoMode,
    pub duration_secs: u32,
    #[serde(default)]
    pub video: Option<MediaRef>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Default for VideoGenData {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            mode: VideoMode::Standard,
            duration_secs: 5,
            video: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioGenData {
    pub prompt: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub audio: Option<MediaRef>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisData {
    pub prompt: String,
    #[serde(default)]
    pub video: Option<MediaRef>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageEditData {
    pub prompt: String,
    #[serde(default)]
    pub image: Option<MediaRef>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoryData {
    pub prompt: String,
    #[serde(default)]
    pub scenes: Vec<StoryScene>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-type payload. The node's [`NodeType`] is derived from the variant,
/// so type and payload cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum NodeData {
    PromptInput(PromptData),
    ImageGenerator(ImageGenData),
    VideoGenerator(VideoGenData),
    AudioGenerator(AudioGenData),
    VideoAnalyzer(AnalysisData),
    ImageEditor(ImageEditData),
    StoryGenerator(StoryData),
}

impl NodeData {
    /// Empty payload for a node type.
    pub fn for_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::PromptInput => NodeData::PromptInput(PromptData::default()),
            NodeType::ImageGenerator => NodeData::ImageGenerator(ImageGenData::default()),
            NodeType::VideoGenerator => NodeData::VideoGenerator(VideoGenData::default()),
            NodeType::AudioGenerator => NodeData::AudioGenerator(AudioGenData::default()),
            NodeType::VideoAnalyzer => NodeData::VideoAnalyzer(AnalysisData::default()),
            NodeType::ImageEditor => NodeData::ImageEditor(ImageEditData::default()),
            NodeType::StoryGenerator => NodeData::StoryGenerator(StoryData::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::PromptInput(_) => NodeType::PromptInput,
            NodeData::ImageGenerator(_) => NodeType::ImageGenerator,
            NodeData::VideoGenerator(_) => NodeType::VideoGenerator,
            NodeData::AudioGenerator(_) => NodeType::AudioGenerator,
            NodeData::VideoAnalyzer(_) => NodeType::VideoAnalyzer,
            NodeData::ImageEditor(_) => NodeType::ImageEditor,
            NodeData::StoryGenerator(_) => NodeType::StoryGenerator,
        }
    }

    /// The user-authored text: prompt-input text, or the node's own prompt.
    pub fn prompt(&self) -> &str {
        match self {
            NodeData::PromptInput(d) => &d.text,
            NodeData::ImageGenerator(d) => &d.prompt,
            NodeData::VideoGenerator(d) => &d.prompt,
            NodeData::AudioGenerator(d) => &d.prompt,
            NodeData::VideoAnalyzer(d) => &d.prompt,
            NodeData::ImageEditor(d) => &d.prompt,
            NodeData::StoryGenerator(d) => &d.prompt,
        }
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self {
            NodeData::PromptInput(d) => d.text = text,
            NodeData::ImageGenerator(d) => d.prompt = text,
            NodeData::VideoGenerator(d) => d.prompt = text,
            NodeData::AudioGenerator(d) => d.prompt = text,
            NodeData::VideoAnalyzer(d) => d.prompt = text,
            NodeData::ImageEditor(d) => d.prompt = text,
            NodeData::StoryGenerator(d) => d.prompt = text,
        }
    }

    /// Declared `"W:H"` aspect ratio, for the media types that have one.
    pub fn aspect_ratio(&self) -> Option<&str> {
        match self {
            NodeData::ImageGenerator(d) => Some(&d.aspect_ratio),
            NodeData::VideoGenerator(d) => Some(&d.aspect_ratio),
            _ => None,
        }
    }

    pub fn is_cut_mode(&self) -> bool {
        matches!(self, NodeData::VideoGenerator(d) if d.mode == VideoMode::Cut)
    }

    /// Last generation error. Prompt inputs never fail.
    pub fn error(&self) -> Option<&str> {
        match self {
            NodeData::PromptInput(_) => None,
            NodeData::ImageGenerator(d) => d.error.as_deref(),
            NodeData::VideoGenerator(d) => d.error.as_deref(),
            NodeData::AudioGenerator(d) => d.error.as_deref(),
            NodeData::VideoAnalyzer(d) => d.error.as_deref(),
            NodeData::ImageEditor(d) => d.error.as_deref(),
            NodeData::StoryGenerator(d) => d.error.as_deref(),
        }
    }

    pub fn set_error(&mut self, error: Option<String>) {
        match self {
            NodeData::PromptInput(_) => {}
            NodeData::ImageGenerator(d) => d.error = error,
            NodeData::VideoGenerator(d) => d.error = error,
            NodeData::AudioGenerator(d) => d.error = error,
            NodeData::VideoAnalyzer(d) => d.error = error,
            NodeData::ImageEditor(d) => d.error = error,
            NodeData::StoryGenerator(d) => d.error = error,
        }
    }

    /// Media this node currently holds (generated output or attached source).
    pub fn media(&self) -> Vec<MediaRef> {
        match self {
            NodeData::PromptInput(_) | NodeData::StoryGenerator(_) => Vec::new(),
            NodeData::ImageGenerator(d) => d.images.clone(),
            NodeData::VideoGenerator(d) => d.video.iter().cloned().collect(),
            NodeData::AudioGenerator(d) => d.audio.iter().cloned().collect(),
            NodeData::VideoAnalyzer(d) => d.video.iter().cloned().collect(),
            NodeData::ImageEditor(d) => d.image.iter().cloned().collect(),
        }
    }
}

// ─── Scene elements ──────────────────────────────────────────────────────

/// A typed unit of work placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,

    /// World-space top-left corner.
    pub x: f32,
    pub y: f32,

    /// Measured size. `None` falls back to the geometry heuristic.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,

    #[serde(default)]
    pub status: NodeStatus,

    pub data: NodeData,

    /// Upstream node ids in slot order. Order is user-controlled and feeds
    /// prompt composition.
    #[serde(default)]
    pub inputs: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn new(id: NodeId, node_type: NodeType, x: f32, y: f32) -> Self {
        Self {
            id,
            title: node_type.default_title().to_string(),
            x,
            y,
            width: None,
            height: None,
            status: NodeStatus::Idle,
            data: NodeData::for_type(node_type),
            inputs: SmallVec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }
}

/// A directed edge from one node's output to another node's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

impl Connection {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.from == id || self.to == id
    }
}

/// A rectangular spatial container. Members are derived from geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Group {
    pub fn new(id: GroupId, bounds: Bounds) -> Self {
        Self {
            id,
            title: "Group".to_string(),
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// The complete canvas content.
///
/// `Clone` is the deep copy used for history snapshots: every field is an
/// owned value (interned ids are `Copy`), so a clone shares nothing mutable
/// with the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub groups: Vec<Group>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node (painted on top of existing ones).
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index(id).is_some()
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Remove a group rectangle. The nodes inside it are untouched.
    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        let idx = self.groups.iter().position(|g| g.id == id)?;
        Some(self.groups.remove(idx))
    }

    /// Serialize to pretty JSON (export / debugging).
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a scene from JSON and drop any connection or input id that
    /// references a missing node.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let mut scene: Scene =
            serde_json::from_str(json).map_err(|e| format!("Scene parse error: {e}"))?;
        scene.sweep_dangling();
        Ok(scene)
    }
}

// ─── Geometry primitives ─────────────────────────────────────────────────

/// A 2D point (world or screen space depending on context).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalize a drag rectangle from two corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Exclusive containment: a point on the edge is outside.
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }

    /// AABB overlap. Rectangles that only touch do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `pad` on every side.
    pub fn expand(&self, pad: f32) -> Bounds {
        Bounds::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    pub fn with_origin(&self, x: f32, y: f32) -> Bounds {
        Bounds::new(x, y, self.width, self.height)
    }
}
