//! Generation collaborator.
//!
//! A generation runs in three steps so that no store borrow is held while
//! the service is working:
//!
//! 1. [`begin_generation`] (sync) refuses a node whose previous call is
//!    still pending, marks the node `WORKING` and builds the request from
//!    the node and its direct inputs.
//! 2. The [`GenerationService`] runs (async, possibly concurrently with
//!    other nodes).
//! 3. [`finish_generation`] (sync) writes the result or error into the node
//!    and sets `SUCCESS` / `ERROR`. A node deleted in flight is skipped.
//!
//! There is no cancellation: a pending completion always lands.

use crate::store::{CanvasMutation, CanvasStore};
use loom_core::geometry::bounds_of;
use loom_core::id::NodeId;
use loom_core::model::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use thiserror::Error;

/// Horizontal gap between a storyboard and its spawned scene column.
pub const STORYBOARD_GAP_X: f32 = 120.0;
/// Vertical gap between spawned scene nodes.
pub const STORYBOARD_GAP_Y: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("node {0} is already generating")]
    Busy(NodeId),
    #[error("node {0} not found")]
    Missing(NodeId),
    #[error("prompt input nodes do not generate")]
    NotGenerative,
    #[error("nothing to generate from: prompt and inputs are empty")]
    EmptyPrompt,
    #[error("{0}")]
    Service(String),
    #[error("{node_type} node cannot accept a {result} result")]
    Mismatch {
        node_type: &'static str,
        result: &'static str,
    },
}

/// What a service is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub node: NodeId,
    pub node_type: NodeType,
    /// Input texts in slot order, then the node's own prompt, separated by
    /// blank lines.
    pub prompt: String,
    /// Media from direct inputs, then the node's own source media.
    pub inputs: Vec<MediaRef>,
    pub aspect_ratio: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum MediaResult {
    Images(Vec<MediaRef>),
    Video(MediaRef),
    Audio(MediaRef),
    /// Text produced by video analysis.
    Analysis(String),
    EditedImage(MediaRef),
    Story(Vec<StoryScene>),
}

impl MediaResult {
    fn kind(&self) -> &'static str {
        match self {
            MediaResult::Images(_) => "images",
            MediaResult::Video(_) => "video",
            MediaResult::Audio(_) => "audio",
            MediaResult::Analysis(_) => "analysis",
            MediaResult::EditedImage(_) => "edited image",
            MediaResult::Story(_) => "story",
        }
    }
}

/// External AI backend. One call per node generation.
#[allow(async_fn_in_trait)]
pub trait GenerationService {
    async fn generate(&self, request: GenerationRequest) -> Result<MediaResult, GenerationError>;
}

// ─── Begin ───────────────────────────────────────────────────────────────

/// Mark the node `WORKING` and build its request.
///
/// A node with a pending call is refused without changes. The store's
/// in-flight set is the gate rather than the status, which undo or a
/// reload can bring back stale. An empty request marks the node `ERROR`
/// immediately.
pub fn begin_generation(
    store: &mut CanvasStore,
    id: NodeId,
) -> Result<GenerationRequest, GenerationError> {
    let node = store.scene.node(id).ok_or(GenerationError::Missing(id))?;
    if store.is_in_flight(id) {
        return Err(GenerationError::Busy(id));
    }
    if node.node_type() == NodeType::PromptInput {
        return Err(GenerationError::NotGenerative);
    }

    let request = build_request(&store.scene, node);
    if request.prompt.is_empty() && request.inputs.is_empty() {
        fail(store, id, &GenerationError::EmptyPrompt);
        return Err(GenerationError::EmptyPrompt);
    }

    if let Some(node) = store.scene.node(id) {
        let mut data = node.data.clone();
        data.set_error(None);
        store.apply_mutation(CanvasMutation::SetData {
            id,
            data: Box::new(data),
        });
    }
    store.mark_in_flight(id);
    store.apply_mutation(CanvasMutation::SetStatus {
        id,
        status: NodeStatus::Working,
    });
    log::debug!(
        "generation: {id} ({}) started with {} inputs",
        request.node_type.as_str(),
        request.inputs.len()
    );
    Ok(request)
}

fn build_request(scene: &Scene, node: &Node) -> GenerationRequest {
    let upstream = scene.inputs_of(node.id);

    let mut parts: Vec<&str> = upstream
        .iter()
        .map(|n| n.data.prompt().trim())
        .filter(|t| !t.is_empty())
        .collect();
    let own = node.data.prompt().trim();
    if !own.is_empty() {
        parts.push(own);
    }

    let mut inputs: Vec<MediaRef> = upstream.iter().flat_map(|n| n.data.media()).collect();
    match &node.data {
        NodeData::VideoAnalyzer(d) => inputs.extend(d.video.iter().cloned()),
        NodeData::ImageEditor(d) => inputs.extend(d.image.iter().cloned()),
        _ => {}
    }

    let (model, voice, duration_secs) = match &node.data {
        NodeData::ImageGenerator(d) => (d.model.clone(), None, None),
        NodeData::AudioGenerator(d) => (None, d.voice.clone(), None),
        NodeData::VideoGenerator(d) => (None, None, Some(d.duration_secs)),
        _ => (None, None, None),
    };

    GenerationRequest {
        node: node.id,
        node_type: node.node_type(),
        prompt: parts.join("\n\n"),
        inputs,
        aspect_ratio: node.data.aspect_ratio().map(str::to_string),
        model,
        voice,
        duration_secs,
    }
}

// ─── Finish ──────────────────────────────────────────────────────────────

/// Land a completion. Returns the ids of nodes spawned by a storyboard
/// fan-out (empty otherwise).
pub fn finish_generation(
    store: &mut CanvasStore,
    id: NodeId,
    result: Result<MediaResult, GenerationError>,
) -> Vec<NodeId> {
    store.clear_in_flight(id);
    let Some(node) = store.scene.node(id) else {
        log::info!("generation: {id} was deleted in flight, dropping result");
        return Vec::new();
    };

    let result = match result {
        Ok(media) => write_result(node.data.clone(), media),
        Err(e) => Err(e),
    };
    let (data, media) = match result {
        Ok(ok) => ok,
        Err(e) => {
            log::warn!("generation: {id} failed: {e}");
            fail(store, id, &e);
            return Vec::new();
        }
    };

    let node_type = data.node_type();
    let prompt = data.prompt().to_string();
    let scenes = match &data {
        NodeData::StoryGenerator(d) => d.scenes.clone(),
        _ => Vec::new(),
    };
    store.apply_mutation(CanvasMutation::SetData {
        id,
        data: Box::new(data),
    });
    store.apply_mutation(CanvasMutation::SetStatus {
        id,
        status: NodeStatus::Success,
    });
    store.library.record_assets(id, node_type, &prompt, &media);
    log::debug!("generation: {id} succeeded with {} media", media.len());

    if scenes.is_empty() {
        Vec::new()
    } else {
        spawn_storyboard(store, id, &scenes)
    }
}

/// Fold a result into a payload. Returns the new payload and the media to
/// record as assets.
fn write_result(
    mut data: NodeData,
    result: MediaResult,
) -> Result<(NodeData, Vec<MediaRef>), GenerationError> {
    let kind = result.kind();
    let media = match (&mut data, result) {
        (NodeData::ImageGenerator(d), MediaResult::Images(images)) => {
            d.images = images.clone();
            images
        }
        (NodeData::VideoGenerator(d), MediaResult::Video(video)) => {
            d.video = Some(video.clone());
            vec![video]
        }
        (NodeData::AudioGenerator(d), MediaResult::Audio(audio)) => {
            d.audio = Some(audio.clone());
            vec![audio]
        }
        (NodeData::VideoAnalyzer(d), MediaResult::Analysis(text)) => {
            d.analysis = Some(text);
            Vec::new()
        }
        (NodeData::ImageEditor(d), MediaResult::EditedImage(image)) => {
            d.image = Some(image.clone());
            vec![image]
        }
        (NodeData::StoryGenerator(d), MediaResult::Story(scenes)) => {
            d.scenes = scenes;
            Vec::new()
        }
        (data, _) => {
            return Err(GenerationError::Mismatch {
                node_type: data.node_type().as_str(),
                result: kind,
            });
        }
    };
    data.set_error(None);
    Ok((data, media))
}

fn fail(store: &mut CanvasStore, id: NodeId, error: &GenerationError) {
    if let Some(node) = store.scene.node(id) {
        let mut data = node.data.clone();
        data.set_error(Some(error.to_string()));
        store.apply_mutation(CanvasMutation::SetData {
            id,
            data: Box::new(data),
        });
    }
    store.apply_mutation(CanvasMutation::SetStatus {
        id,
        status: NodeStatus::Error,
    });
}

/// One image generator per scene, stacked in a column to the right of the
/// story node and fed from it. Undoes as one step.
fn spawn_storyboard(store: &mut CanvasStore, story: NodeId, scenes: &[StoryScene]) -> Vec<NodeId> {
    let Some(origin) = store.scene.node(story).map(bounds_of) else {
        return Vec::new();
    };
    let mut spawned = Vec::with_capacity(scenes.len());
    store.batch("storyboard", |store| {
        let x = origin.right() + STORYBOARD_GAP_X;
        let mut y = origin.y;
        for scene in scenes {
            let id = store.fresh_node_id();
            let mut node = Node::new(id, NodeType::ImageGenerator, x, y);
            node.title = scene.title.clone();
            node.data.set_prompt(scene.description.clone());
            y += bounds_of(&node).height + STORYBOARD_GAP_Y;

            store.apply_mutation(CanvasMutation::AddNode {
                node: Box::new(node),
            });
            store.apply_mutation(CanvasMutation::Connect { from: story, to: id });
            spawned.push(id);
        }
        !spawned.is_empty()
    });
    log::debug!("storyboard: {story} spawned {} scene nodes", spawned.len());
    spawned
}

// ─── Driver ──────────────────────────────────────────────────────────────

/// Run one node's generation end to end. The store is borrowed only for
/// the synchronous begin and finish steps, so other nodes can start while
/// this one awaits.
pub async fn generate_node<G: GenerationService>(
    store: &RefCell<CanvasStore>,
    service: &G,
    id: NodeId,
) -> Result<Vec<NodeId>, GenerationError> {
    let request = begin_generation(&mut store.borrow_mut(), id)?;
    let result = service.generate(request).await;
    let failure = result.as_ref().err().cloned();
    let spawned = finish_generation(&mut store.borrow_mut(), id, result);
    match failure {
        Some(e) => Err(e),
        None => Ok(spawned),
    }
}
