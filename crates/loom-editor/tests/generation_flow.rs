//! Integration tests: generation and persistence collaborators driven
//! against a live store.

use loom_core::id::NodeId;
use loom_core::model::*;
use loom_editor::persist::{AutoSaver, MemoryStorage, Persistence};
use loom_editor::pipeline::{
    GenerationError, GenerationRequest, GenerationService, MediaResult, begin_generation,
    finish_generation, generate_node,
};
use loom_editor::store::{CanvasMutation, CanvasStore};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use tokio::sync::Mutex;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every request and answers by node type.
#[derive(Default)]
struct FakeService {
    requests: Mutex<Vec<GenerationRequest>>,
    fail_with: Option<String>,
}

impl GenerationService for FakeService {
    async fn generate(&self, request: GenerationRequest) -> Result<MediaResult, GenerationError> {
        self.requests.lock().await.push(request.clone());
        if let Some(message) = &self.fail_with {
            return Err(GenerationError::Service(message.clone()));
        }
        Ok(match request.node_type {
            NodeType::ImageGenerator => MediaResult::Images(vec![MediaRef::new(format!(
                "https://cdn.test/{}.png",
                request.node
            ))]),
            NodeType::VideoGenerator => MediaResult::Video(MediaRef::new("https://cdn.test/v.mp4")),
            NodeType::AudioGenerator => MediaResult::Audio(MediaRef::new("https://cdn.test/a.mp3")),
            NodeType::VideoAnalyzer => MediaResult::Analysis("two people talking".into()),
            NodeType::ImageEditor => MediaResult::EditedImage(MediaRef::new("https://cdn.test/e.png")),
            NodeType::StoryGenerator => MediaResult::Story(vec![
                StoryScene {
                    title: "One".into(),
                    description: "a boat leaves".into(),
                },
                StoryScene {
                    title: "Two".into(),
                    description: "the boat returns".into(),
                },
                StoryScene {
                    title: "Three".into(),
                    description: "night falls".into(),
                },
            ]),
            NodeType::PromptInput => return Err(GenerationError::NotGenerative),
        })
    }
}

fn prompt(store: &mut CanvasStore, text: &str, x: f32, y: f32) -> NodeId {
    let id = store.create_node(NodeType::PromptInput, Point::new(x, y));
    let mut data = NodeData::for_type(NodeType::PromptInput);
    data.set_prompt(text);
    store.execute(
        CanvasMutation::SetData {
            id,
            data: Box::new(data),
        },
        "edit prompt",
    );
    id
}

#[tokio::test]
async fn image_generation_end_to_end() {
    init_logging();
    let service = FakeService::default();
    let store = RefCell::new(CanvasStore::default());
    let img = {
        let mut s = store.borrow_mut();
        let p = prompt(&mut s, "a lighthouse", 0.0, 0.0);
        let img = s.create_node(NodeType::ImageGenerator, Point::new(600.0, 0.0));
        s.execute(CanvasMutation::Connect { from: p, to: img }, "connect");
        img
    };

    let spawned = generate_node(&store, &service, img).await.unwrap();
    assert!(spawned.is_empty());
    assert_eq!(service.requests.lock().await[0].prompt, "a lighthouse");

    let s = store.borrow();
    let node = s.scene.node(img).unwrap();
    assert_eq!(node.status, NodeStatus::Success);
    assert_eq!(node.data.media().len(), 1);
    assert_eq!(s.library.assets.len(), 1);
}

#[tokio::test]
async fn service_failure_is_node_local() {
    let service = FakeService {
        fail_with: Some("rate limited".into()),
        ..FakeService::default()
    };
    let store = RefCell::new(CanvasStore::default());
    let (vid, other) = {
        let mut s = store.borrow_mut();
        let other = prompt(&mut s, "untouched", 0.0, 800.0);
        let vid = s.create_node(NodeType::VideoGenerator, Point::new(0.0, 0.0));
        if let Some(n) = s.scene.node_mut(vid) {
            n.data.set_prompt("surf");
        }
        (vid, other)
    };

    let err = generate_node(&store, &service, vid).await.unwrap_err();
    assert_eq!(err, GenerationError::Service("rate limited".into()));

    let s = store.borrow();
    let node = s.scene.node(vid).unwrap();
    assert_eq!(node.status, NodeStatus::Error);
    assert_eq!(node.data.error(), Some("rate limited"));
    assert_eq!(s.scene.node(other).unwrap().status, NodeStatus::Idle);
}

#[tokio::test]
async fn storyboard_spawns_connected_scene_nodes() {
    let service = FakeService::default();
    let store = RefCell::new(CanvasStore::default());
    let story = {
        let mut s = store.borrow_mut();
        let id = s.create_node(NodeType::StoryGenerator, Point::new(0.0, 0.0));
        if let Some(n) = s.scene.node_mut(id) {
            n.data.set_prompt("a fishing village");
        }
        id
    };

    let spawned = generate_node(&store, &service, story).await.unwrap();
    assert_eq!(spawned.len(), 3);

    let s = store.borrow();
    for id in &spawned {
        let node = s.scene.node(*id).unwrap();
        assert_eq!(node.node_type(), NodeType::ImageGenerator);
        assert_eq!(node.inputs.as_slice(), &[story]);
        assert!(node.x > 420.0);
    }
    let ys: Vec<f32> = spawned.iter().map(|id| s.scene.node(*id).unwrap().y).collect();
    assert!(ys.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn completion_after_delete_is_dropped() {
    let mut store = CanvasStore::default();
    let img = store.create_node(NodeType::ImageGenerator, Point::ORIGIN);
    if let Some(n) = store.scene.node_mut(img) {
        n.data.set_prompt("x");
    }
    begin_generation(&mut store, img).unwrap();
    store.execute(CanvasMutation::RemoveNode { id: img }, "delete");

    let spawned = finish_generation(
        &mut store,
        img,
        Ok(MediaResult::Images(vec![MediaRef::new("late.png")])),
    );
    assert!(spawned.is_empty());
    assert!(store.scene.nodes.is_empty());
    assert!(store.library.assets.is_empty());
}

#[tokio::test]
async fn generated_state_persists_and_reloads() {
    let service = FakeService::default();
    let persistence = Persistence::new(MemoryStorage::new());
    let mut saver = AutoSaver::new();
    let store = RefCell::new(CanvasStore::default());
    let img = {
        let mut s = store.borrow_mut();
        let img = s.create_node(NodeType::ImageGenerator, Point::ORIGIN);
        if let Some(n) = s.scene.node_mut(img) {
            n.data.set_prompt("a red kite");
        }
        s.save_workflow("draft");
        img
    };
    generate_node(&store, &service, img).await.unwrap();

    let point = saver.save_point(&store.borrow()).unwrap();
    assert!(saver.flush(&persistence, point).await);

    let mut fresh = CanvasStore::default();
    persistence.load_all().await.install(&mut fresh);
    assert_eq!(fresh.scene, store.borrow().scene);
    assert_eq!(fresh.library.workflows.len(), 1);
    assert_eq!(fresh.library.assets.len(), 1);
    assert!(!fresh.can_undo());
}

#[tokio::test]
async fn scene_saved_mid_generation_reloads_unlocked() {
    let persistence = Persistence::new(MemoryStorage::new());
    let mut store = CanvasStore::default();
    let img = store.create_node(NodeType::ImageGenerator, Point::ORIGIN);
    if let Some(n) = store.scene.node_mut(img) {
        n.data.set_prompt("a red kite");
    }
    begin_generation(&mut store, img).unwrap();
    persistence.save_scene(&store.scene).await.unwrap();

    let mut fresh = CanvasStore::default();
    persistence.load_all().await.install(&mut fresh);
    assert_eq!(fresh.scene.node(img).unwrap().status, NodeStatus::Idle);
    let request = begin_generation(&mut fresh, img).unwrap();
    assert_eq!(request.prompt, "a red kite");
}
