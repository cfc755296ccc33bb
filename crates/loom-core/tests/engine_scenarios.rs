//! Integration tests: loom-core engines driven together on loaded scenes.

use loom_core::collision::{PushDirection, resolve_collisions};
use loom_core::config::CanvasConfig;
use loom_core::groups::{free_nodes, group_of, members_of};
use loom_core::id::NodeId;
use loom_core::model::*;
use loom_core::snap::snap_bounds;
use loom_core::viewport::Viewport;
use pretty_assertions::assert_eq;

const SCENE: &str = r#"{
    "nodes": [
        {"id": "t_prompt", "title": "Prompt", "x": 0, "y": 0, "width": 200, "height": 100,
         "data": {"type": "prompt-input", "data": {"text": "a harbor at dawn"}}},
        {"id": "t_style", "title": "Prompt", "x": 0, "y": 300, "width": 200, "height": 100,
         "data": {"type": "prompt-input", "data": {"text": "watercolor"}}},
        {"id": "t_image", "title": "Image", "x": 1000, "y": 0,
         "data": {"type": "image-generator", "data": {"prompt": "", "aspect_ratio": "1:1"}},
         "inputs": ["t_prompt", "t_style", "t_gone"]}
    ],
    "connections": [
        {"from": "t_prompt", "to": "t_image"},
        {"from": "t_style", "to": "t_image"},
        {"from": "t_prompt", "to": "t_image"},
        {"from": "t_gone", "to": "t_image"}
    ],
    "groups": [
        {"id": "t_group", "title": "Inputs", "x": -50, "y": -50, "width": 320, "height": 500}
    ]
}"#;

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

#[test]
fn loaded_scene_is_swept_and_queryable() {
    let scene = Scene::from_json(SCENE).unwrap();

    assert_eq!(
        scene.connections,
        vec![
            Connection::new(id("t_prompt"), id("t_image")),
            Connection::new(id("t_style"), id("t_image")),
        ]
    );
    let image = scene.node(id("t_image")).unwrap();
    assert_eq!(image.inputs.as_slice(), &[id("t_prompt"), id("t_style")]);
    assert_eq!(scene.downstream_of(id("t_style")), vec![id("t_image")]);

    let prompts: Vec<&str> = scene
        .inputs_of(id("t_image"))
        .iter()
        .map(|n| n.data.prompt())
        .collect();
    assert_eq!(prompts, vec!["a harbor at dawn", "watercolor"]);
}

#[test]
fn reordering_inputs_changes_composition_order() {
    let mut scene = Scene::from_json(SCENE).unwrap();
    assert!(scene.reorder_input(id("t_image"), 1, 0));
    let order: Vec<NodeId> = scene.inputs_of(id("t_image")).iter().map(|n| n.id).collect();
    assert_eq!(order, vec![id("t_style"), id("t_prompt")]);
    // connections themselves are untouched
    assert_eq!(scene.connections.len(), 2);
}

#[test]
fn group_membership_follows_geometry() {
    let mut scene = Scene::from_json(SCENE).unwrap();
    let group = scene.groups[0].clone();
    assert_eq!(members_of(&scene, &group), vec![id("t_prompt"), id("t_style")]);

    let all: Vec<NodeId> = scene.nodes.iter().map(|n| n.id).collect();
    assert_eq!(free_nodes(&scene, &all), vec![id("t_image")]);

    // moving a node out of the rectangle ends its membership
    scene.node_mut(id("t_style")).unwrap().x = 600.0;
    let style = scene.node(id("t_style")).unwrap();
    assert_eq!(group_of(&scene, style), None);
}

#[test]
fn snap_threshold_widens_when_zoomed_out() {
    let config = CanvasConfig::default();
    let others = [Bounds::new(0.0, 0.0, 420.0, 360.0)];
    // left edge 10 units right of the other node's right edge
    let proposed = Bounds::new(430.0, 1000.0, 420.0, 360.0);

    let at_one = snap_bounds(proposed, &others, 1.0, &config);
    assert!(!at_one.snapped());
    assert_eq!(at_one.bounds, proposed);

    let at_half = snap_bounds(proposed, &others, 0.5, &config);
    assert_eq!(at_half.bounds.x, 420.0);
    assert_eq!(at_half.guide_x, Some(420.0));
    assert_eq!(at_half.guide_y, None);
}

#[test]
fn collisions_resolve_in_neighbor_order() {
    let config = CanvasConfig::default();
    let a = (id("t_left"), Bounds::new(0.0, 0.0, 420.0, 360.0));
    let b = (id("t_right"), Bounds::new(450.0, 0.0, 420.0, 360.0));
    let dropped = Bounds::new(400.0, 10.0, 420.0, 360.0);

    let outcome = resolve_collisions(dropped, &[a, b], &config);
    assert_eq!(
        outcome.pushed_by,
        vec![(a.0, PushDirection::Right), (b.0, PushDirection::Down)]
    );
    assert_eq!(outcome.bounds, Bounds::new(444.0, 384.0, 420.0, 360.0));
    assert!(!outcome.bounds.intersects(&a.1));
    assert!(!outcome.bounds.intersects(&b.1));
}

#[test]
fn zoom_keeps_cursor_anchored_and_clamps() {
    let config = CanvasConfig::default();
    let mut viewport = Viewport::default();
    let cursor = Point::new(400.0, 300.0);
    let before = viewport.screen_to_world(cursor.x, cursor.y);

    viewport.zoom_at(cursor, -500.0, &config);
    assert_eq!(viewport.scale, 1.5);
    assert_eq!(viewport.screen_to_world(cursor.x, cursor.y), before);

    viewport.zoom_at(cursor, 50_000.0, &config);
    assert_eq!(viewport.scale, config.min_scale);
    viewport.zoom_at(cursor, -50_000.0, &config);
    assert_eq!(viewport.scale, config.max_scale);
}
