//! Integration tests: canvas invariants across loom-core and loom-editor.
//!
//! Drives the store and interaction controller the way a host would and
//! checks the properties every build must keep.

use loom_core::geometry::bounds_of;
use loom_core::groups::members_of;
use loom_core::id::NodeId;
use loom_core::model::*;
use loom_editor::input::{InputEvent, Modifiers, PointerButton};
use loom_editor::interaction::InteractionController;
use loom_editor::store::{CanvasMutation, CanvasStore};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn down(x: f32, y: f32) -> InputEvent {
    InputEvent::PointerDown {
        x,
        y,
        button: PointerButton::Left,
        modifiers: Modifiers::NONE,
    }
}

fn mv(x: f32, y: f32) -> InputEvent {
    InputEvent::PointerMove {
        x,
        y,
        modifiers: Modifiers::NONE,
    }
}

fn up(x: f32, y: f32) -> InputEvent {
    InputEvent::PointerUp {
        x,
        y,
        modifiers: Modifiers::NONE,
    }
}

fn add(store: &mut CanvasStore, node_type: NodeType, x: f32, y: f32) -> NodeId {
    store.create_node(node_type, Point::new(x, y))
}

// ─── Undo ────────────────────────────────────────────────────────────────

#[test]
fn add_move_delete_then_three_undos_restores_scene() {
    init_logging();
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    let seed_a = add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    let seed_b = add(&mut store, NodeType::ImageGenerator, 600.0, 0.0);
    store.execute(CanvasMutation::Connect { from: seed_a, to: seed_b }, "connect");
    let before = store.scene.clone();

    // add
    let id = add(&mut store, NodeType::AudioGenerator, 0.0, 1000.0);
    // move by dragging
    ctl.handle(&mut store, &down(10.0, 1010.0));
    ctl.handle(&mut store, &mv(310.0, 1210.0));
    ctl.handle(&mut store, &up(310.0, 1210.0));
    assert_eq!(store.scene.node(id).unwrap().x, 300.0);
    // delete
    store.selection.nodes = vec![id];
    assert!(store.delete_selection());

    assert_eq!(store.undo().as_deref(), Some("delete selection"));
    assert_eq!(store.undo().as_deref(), Some("move node"));
    assert_eq!(store.undo().as_deref(), Some("add node"));
    assert_eq!(store.scene, before);
}

#[test]
fn history_is_capped_at_fifty() {
    let mut store = CanvasStore::default();
    for i in 0..60 {
        add(&mut store, NodeType::PromptInput, i as f32 * 500.0, 0.0);
    }
    let mut steps = 0;
    while store.undo().is_some() {
        steps += 1;
    }
    assert_eq!(steps, 50);
    assert_eq!(store.scene.nodes.len(), 10);
}

// ─── Connection graph ────────────────────────────────────────────────────

#[test]
fn removing_a_node_leaves_no_references() {
    let mut store = CanvasStore::default();
    let a = add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    let b = add(&mut store, NodeType::ImageGenerator, 600.0, 0.0);
    let c = add(&mut store, NodeType::VideoGenerator, 1200.0, 0.0);
    for (from, to) in [(a, b), (a, c), (b, c)] {
        store.execute(CanvasMutation::Connect { from, to }, "connect");
    }
    store.execute(CanvasMutation::RemoveNode { id: a }, "delete");

    for conn in &store.scene.connections {
        assert!(store.scene.contains_node(conn.from));
        assert!(store.scene.contains_node(conn.to));
        assert!(!conn.touches(a));
    }
    assert!(store.scene.nodes.iter().all(|n| !n.inputs.contains(&a)));
    assert_eq!(store.scene.node(c).unwrap().inputs.as_slice(), &[b]);
}

#[test]
fn connecting_twice_yields_one_edge() {
    let mut store = CanvasStore::default();
    let a = add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    let b = add(&mut store, NodeType::ImageGenerator, 600.0, 0.0);
    assert!(store.execute(CanvasMutation::Connect { from: a, to: b }, "connect"));
    let steps = store.history().len();
    assert!(!store.execute(CanvasMutation::Connect { from: a, to: b }, "connect"));
    assert_eq!(store.scene.connections, vec![Connection::new(a, b)]);
    // the rejected duplicate records no undo step
    assert_eq!(store.history().len(), steps);
}

// ─── Geometry ────────────────────────────────────────────────────────────

#[test]
fn resize_floor_holds_for_every_gesture() {
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    let id = add(&mut store, NodeType::VideoGenerator, 0.0, 0.0);
    let b = bounds_of(store.scene.node(id).unwrap());

    ctl.handle(&mut store, &down(b.right() - 2.0, b.bottom() - 2.0));
    for (x, y) in [(-500.0, -500.0), (10.0, 600.0), (900.0, 5.0)] {
        ctl.handle(&mut store, &mv(x, y));
        let n = store.scene.node(id).unwrap();
        assert!(n.width.unwrap() >= 360.0);
        assert!(n.height.unwrap() >= 240.0);
    }
    ctl.handle(&mut store, &up(900.0, 5.0));
}

#[test]
fn snap_to_right_edge_example() {
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    add(&mut store, NodeType::ImageGenerator, 100.0, 100.0);
    let b = add(&mut store, NodeType::ImageGenerator, 2000.0, 2000.0);

    ctl.handle(&mut store, &down(2000.0 + 50.0, 2000.0 + 50.0));
    ctl.handle(&mut store, &mv(524.0 + 50.0, 2000.0 + 50.0));
    assert_eq!(store.scene.node(b).unwrap().x, 520.0);
    ctl.handle(&mut store, &up(524.0 + 50.0, 2000.0 + 50.0));
}

#[test]
fn identical_drop_is_pushed_by_padding() {
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    let a = add(&mut store, NodeType::ImageGenerator, 100.0, 100.0);
    let b = add(&mut store, NodeType::ImageGenerator, 2000.0, 2000.0);

    // drag b exactly onto a (snap agrees: every edge already aligned)
    ctl.handle(&mut store, &down(2050.0, 2050.0));
    ctl.handle(&mut store, &mv(150.0, 150.0));
    assert_eq!(store.scene.node(b).unwrap().x, 100.0);
    ctl.handle(&mut store, &up(150.0, 150.0));

    let other = bounds_of(store.scene.node(a).unwrap());
    let dropped = bounds_of(store.scene.node(b).unwrap());
    // 420 x 236.25: the vertical overlap is smaller, so b goes up
    assert_eq!(dropped.x, 100.0);
    assert_eq!(dropped.y, other.y - dropped.height - 24.0);
    assert!(!dropped.intersects(&other));
}

// ─── Groups ──────────────────────────────────────────────────────────────

#[test]
fn marquee_creates_one_group_around_free_nodes() {
    init_logging();
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    let free: Vec<NodeId> = [0.0, 500.0, 1000.0]
        .into_iter()
        .map(|x| add(&mut store, NodeType::PromptInput, x, 0.0))
        .collect();
    let grouped = add(&mut store, NodeType::PromptInput, 0.0, 600.0);
    let existing = store.fresh_group_id();
    store.execute(
        CanvasMutation::AddGroup {
            group: Group::new(existing, Bounds::new(-50.0, 550.0, 520.0, 460.0)),
        },
        "group",
    );

    ctl.handle(&mut store, &down(-100.0, -100.0));
    ctl.handle(&mut store, &mv(1500.0, 1100.0));
    ctl.handle(&mut store, &up(1500.0, 1100.0));

    assert_eq!(store.scene.groups.len(), 2);
    let created = &store.scene.groups[1];
    assert_eq!(created.bounds(), Bounds::new(-32.0, -32.0, 1420.0 + 64.0, 360.0 + 64.0));
    assert_eq!(members_of(&store.scene, created), free);
    assert!(!members_of(&store.scene, created).contains(&grouped));
    assert_eq!(store.selection.nodes.len(), 4);
}

#[test]
fn marquee_with_only_grouped_nodes_creates_nothing() {
    let mut store = CanvasStore::default();
    let mut ctl = InteractionController::new();
    add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    let g = store.fresh_group_id();
    store.execute(
        CanvasMutation::AddGroup {
            group: Group::new(g, Bounds::new(-50.0, -50.0, 520.0, 460.0)),
        },
        "group",
    );

    ctl.handle(&mut store, &down(-200.0, -200.0));
    ctl.handle(&mut store, &up(800.0, 800.0));
    assert_eq!(store.scene.groups.len(), 1);
}

#[test]
fn deleting_a_group_keeps_its_nodes() {
    let mut store = CanvasStore::default();
    let a = add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    let g = store.fresh_group_id();
    store.execute(
        CanvasMutation::AddGroup {
            group: Group::new(g, Bounds::new(-50.0, -50.0, 520.0, 460.0)),
        },
        "group",
    );
    store.select_group(g);
    assert!(store.delete_selection());
    assert!(store.scene.groups.is_empty());
    assert!(store.scene.contains_node(a));
}

// ─── Viewport ────────────────────────────────────────────────────────────

#[test]
fn fit_view_on_empty_canvas() {
    let mut store = CanvasStore::default();
    store.viewport.scale = 0.4;
    store.viewport.pan = Point::new(-300.0, 120.0);
    store.fit_view();
    assert_eq!(store.viewport.scale, 1.0);
    assert_eq!(store.viewport.pan, Point::ORIGIN);
}

#[test]
fn fit_view_frames_content() {
    let mut store = CanvasStore::default();
    store.resize_screen(1000.0, 800.0);
    add(&mut store, NodeType::PromptInput, 0.0, 0.0);
    add(&mut store, NodeType::PromptInput, 3000.0, 2000.0);
    store.fit_view();

    let v = store.viewport;
    assert!(v.scale < 1.0 && v.scale >= 0.2);
    let top_left = v.world_to_screen(0.0, 0.0);
    let bottom_right = v.world_to_screen(3420.0, 2360.0);
    assert!(top_left.x >= 0.0 && top_left.y >= 0.0);
    assert!(bottom_right.x <= 1000.0 && bottom_right.y <= 800.0);
}
