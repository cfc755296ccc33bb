//! WASM bridge for Loom: exposes the canvas engine to a browser host.
//!
//! Compiled via `wasm-pack build --target web`. The host renders nodes as
//! DOM, forwards raw pointer/wheel/key events here and re-reads the scene
//! whenever a handler reports a change. Every query returns JSON.
//!
//! AI calls stay on the JS side: the host asks for a request with
//! `begin_generation`, runs it, and hands the outcome back through
//! `finish_generation` or `fail_generation`.

use loom_core::config::CanvasConfig;
use loom_core::geometry::bounds_of;
use loom_core::id::NodeId;
use loom_core::model::{Bounds, NodeData, NodeType, Scene};
use loom_editor::input::{InputEvent, Modifiers, PointerButton};
use loom_editor::interaction::{InteractionController, Mode};
use loom_editor::library::AssetRecord;
use loom_editor::pipeline::{self, GenerationError, MediaResult};
use loom_editor::shortcuts::{ShortcutAction, ShortcutMap};
use loom_editor::store::{CanvasMutation, CanvasStore};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

/// The WASM-facing canvas controller.
///
/// Owns the one store for the page plus the interaction state machine.
#[wasm_bindgen]
pub struct LoomCanvas {
    store: CanvasStore,
    controller: InteractionController,
}

#[wasm_bindgen]
impl LoomCanvas {
    /// Create a canvas with the given screen size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32) -> Self {
        console_error_panic_hook_setup();
        let mut store = CanvasStore::default();
        store.resize_screen(width, height);
        Self {
            store,
            controller: InteractionController::new(),
        }
    }

    /// Replace tunables from JSON. Missing fields keep their defaults.
    /// Returns `false` (and keeps the old config) on a parse error.
    pub fn set_config_json(&mut self, json: &str) -> bool {
        match CanvasConfig::from_json(json) {
            Ok(config) => {
                self.store.config = config;
                true
            }
            Err(e) => {
                log::warn!("config rejected: {e}");
                false
            }
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.store.resize_screen(width, height);
    }

    /// Change counter; the host saves when it moves.
    pub fn revision(&self) -> f64 {
        self.store.revision() as f64
    }

    // ─── Scene I/O ───────────────────────────────────────────────────────

    pub fn get_scene_json(&self) -> String {
        self.store.scene.to_json()
    }

    /// Load a scene (startup). Not recorded in history. Returns `false` on
    /// a parse error.
    pub fn set_scene_json(&mut self, json: &str) -> bool {
        match Scene::from_json(json) {
            Ok(scene) => {
                self.store.load_scene(scene);
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    pub fn get_viewport_json(&self) -> String {
        serde_json::to_string(&self.store.viewport).unwrap_or_else(|_| "{}".to_string())
    }

    /// Transient overlay state: marquee, snap guides, preview wire, mode.
    pub fn get_overlay_json(&self) -> String {
        let guides = self.controller.guides();
        let overlay = Overlay {
            mode: mode_name(self.controller.mode()),
            marquee: self.controller.marquee_rect(),
            guide_x: guides.x,
            guide_y: guides.y,
            wire: self
                .controller
                .connection_preview(&self.store)
                .map(|(a, b)| Wire {
                    from: [a.x, a.y],
                    to: [b.x, b.y],
                }),
        };
        serde_json::to_string(&overlay).unwrap_or_else(|_| "{}".to_string())
    }

    // ─── Pointer & wheel ─────────────────────────────────────────────────

    /// Returns `true` when the host should redraw.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let event = InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.controller.handle(&mut self.store, &event)
    }

    pub fn handle_pointer_move(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let event = InputEvent::PointerMove {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.controller.handle(&mut self.store, &event)
    }

    /// Forward every release, including ones outside the canvas element.
    /// Returns JSON: `{"changed":bool,"revision":n}`.
    pub fn handle_pointer_up(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        let event = InputEvent::PointerUp {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        let changed = self.controller.handle(&mut self.store, &event);
        json!({"changed": changed, "revision": self.store.revision()}).to_string()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_wheel(
        &mut self,
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let event = InputEvent::Wheel {
            x,
            y,
            dx,
            dy,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.controller.handle(&mut self.store, &event)
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Returns JSON: `{"changed":bool,"action":"<name>"}`. `action` is
    /// `"none"` when the key is unbound or focus is in a text field.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_input: bool,
    ) -> String {
        let modifiers = mods(shift, ctrl, alt, meta);
        let Some(action) = ShortcutMap::resolve(key, modifiers, in_text_input) else {
            return r#"{"changed":false,"action":"none"}"#.to_string();
        };
        let changed = self.controller.run_action(&mut self.store, action);
        json!({"changed": changed, "action": action_to_name(action)}).to_string()
    }

    // ─── Editing API ─────────────────────────────────────────────────────

    /// Create a node whose top-left lands under screen point `(x, y)`
    /// (drag-and-drop from a palette). Returns the new id, or `""` for an
    /// unknown type.
    pub fn create_node_at(&mut self, node_type: &str, x: f32, y: f32) -> String {
        let Some(node_type) = NodeType::parse(node_type) else {
            return String::new();
        };
        let world = self.store.viewport.screen_to_world(x, y);
        let id = self.store.create_node(node_type, world);
        self.store.select_node(id, false);
        id.to_string()
    }

    pub fn connect(&mut self, from: &str, to: &str) -> bool {
        let (Some(from), Some(to)) = (NodeId::get(from), NodeId::get(to)) else {
            return false;
        };
        self.store
            .execute(CanvasMutation::Connect { from, to }, "connect")
    }

    pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
        let (Some(from), Some(to)) = (NodeId::get(from), NodeId::get(to)) else {
            return false;
        };
        self.store
            .execute(CanvasMutation::Disconnect { from, to }, "disconnect")
    }

    pub fn reorder_input(&mut self, node_id: &str, from: usize, to: usize) -> bool {
        let Some(id) = NodeId::get(node_id) else {
            return false;
        };
        self.store
            .execute(CanvasMutation::ReorderInput { id, from, to }, "reorder inputs")
    }

    pub fn set_node_title(&mut self, node_id: &str, title: &str) -> bool {
        let Some(id) = NodeId::get(node_id) else {
            return false;
        };
        self.store.execute(
            CanvasMutation::SetTitle {
                id,
                title: title.to_string(),
            },
            "rename",
        )
    }

    /// Replace a node's payload with `{"type": ..., "data": {...}}`. The
    /// type must match the node's.
    pub fn set_node_data_json(&mut self, node_id: &str, json: &str) -> bool {
        let Some(id) = NodeId::get(node_id) else {
            return false;
        };
        let data: NodeData = match serde_json::from_str(json) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("node data rejected: {e}");
                return false;
            }
        };
        self.store.execute(
            CanvasMutation::SetData {
                id,
                data: Box::new(data),
            },
            "edit node",
        )
    }

    /// Write back the size the host measured after layout.
    pub fn measure_node(&mut self, node_id: &str, width: f32, height: f32) -> bool {
        let Some(id) = NodeId::get(node_id) else {
            return false;
        };
        self.store
            .apply_mutation(CanvasMutation::MeasureNode { id, width, height })
    }

    /// World bounds of a node, or `{}`.
    pub fn get_node_bounds(&self, node_id: &str) -> String {
        NodeId::get(node_id)
            .and_then(|id| self.store.scene.node(id))
            .and_then(|n| serde_json::to_string(&bounds_of(n)).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    pub fn get_selected_ids(&self) -> String {
        let nodes: Vec<&str> = self.store.selection.nodes.iter().map(|id| id.as_str()).collect();
        let groups: Vec<&str> = self.store.selection.groups.iter().map(|id| id.as_str()).collect();
        json!({"nodes": nodes, "groups": groups}).to_string()
    }

    /// Select one node, or clear the selection with `""`.
    pub fn select_by_id(&mut self, node_id: &str) -> bool {
        if node_id.is_empty() {
            self.store.clear_selection();
            return true;
        }
        let Some(id) = NodeId::get(node_id).filter(|id| self.store.scene.contains_node(*id))
        else {
            return false;
        };
        self.store.select_node(id, false);
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        self.store.delete_selection()
    }

    pub fn undo(&mut self) -> bool {
        self.controller
            .run_action(&mut self.store, ShortcutAction::Undo)
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn fit_view(&mut self) {
        self.store.fit_view();
    }

    // ─── Generation ──────────────────────────────────────────────────────

    /// Start a node's generation. Returns JSON
    /// `{"ok":true,"request":{...}}` or `{"ok":false,"error":"..."}`.
    pub fn begin_generation(&mut self, node_id: &str) -> String {
        let Some(id) = NodeId::get(node_id) else {
            return json!({"ok": false, "error": format!("node {node_id} not found")}).to_string();
        };
        match pipeline::begin_generation(&mut self.store, id) {
            Ok(request) => json!({"ok": true, "request": request}).to_string(),
            Err(e) => json!({"ok": false, "error": e.to_string()}).to_string(),
        }
    }

    /// Land a result `{"kind": ..., "value": ...}`. Returns the ids of any
    /// spawned storyboard nodes as a JSON array.
    pub fn finish_generation(&mut self, node_id: &str, result_json: &str) -> String {
        let Some(id) = NodeId::get(node_id) else {
            return "[]".to_string();
        };
        let result = serde_json::from_str::<MediaResult>(result_json)
            .map_err(|e| GenerationError::Service(format!("malformed result: {e}")));
        let spawned = pipeline::finish_generation(&mut self.store, id, result);
        let ids: Vec<&str> = spawned.iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn fail_generation(&mut self, node_id: &str, message: &str) {
        let Some(id) = NodeId::get(node_id) else {
            return;
        };
        pipeline::finish_generation(
            &mut self.store,
            id,
            Err(GenerationError::Service(message.to_string())),
        );
    }

    // ─── Library ─────────────────────────────────────────────────────────

    pub fn save_workflow(&mut self, name: &str) -> String {
        self.store.save_workflow(name)
    }

    pub fn restore_workflow(&mut self, workflow_id: &str) -> bool {
        self.store.restore_workflow(workflow_id)
    }

    /// Workflow summaries and asset history.
    pub fn get_library_json(&self) -> String {
        let library = &self.store.library;
        let view = LibraryView {
            workflows: library
                .workflows
                .iter()
                .map(|w| WorkflowSummary {
                    id: &w.id,
                    name: &w.name,
                    saved_at: w.saved_at,
                    node_count: w.scene.nodes.len(),
                })
                .collect(),
            assets: &library.assets,
        };
        serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string())
    }
}

// ─── JSON views ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Overlay {
    mode: &'static str,
    /// Screen space.
    marquee: Option<Bounds>,
    guide_x: Option<f32>,
    guide_y: Option<f32>,
    wire: Option<Wire>,
}

#[derive(Serialize)]
struct Wire {
    from: [f32; 2],
    to: [f32; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowSummary<'a> {
    id: &'a str,
    name: &'a str,
    saved_at: u64,
    node_count: usize,
}

#[derive(Serialize)]
struct LibraryView<'a> {
    workflows: Vec<WorkflowSummary<'a>>,
    assets: &'a [AssetRecord],
}

// ─── Private helpers ─────────────────────────────────────────────────────

fn mods(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn mode_name(mode: &Mode) -> &'static str {
    match mode {
        Mode::Idle => "idle",
        Mode::Panning { .. } => "panning",
        Mode::Selecting { .. } => "selecting",
        Mode::DraggingNode { .. } => "draggingNode",
        Mode::DraggingGroup { .. } => "draggingGroup",
        Mode::ResizingNode { .. } => "resizingNode",
        Mode::Connecting { .. } => "connecting",
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Delete => "delete",
        ShortcutAction::Undo => "undo",
        ShortcutAction::Copy => "copy",
        ShortcutAction::Paste => "paste",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Deselect => "deselect",
        ShortcutAction::FitView => "fitView",
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Loom WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
