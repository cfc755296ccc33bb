//! The canvas store: single owner of the live scene.
//!
//! One store is constructed at startup and handed by reference to every
//! consumer (controller, collaborators, host bridge). All scene mutation
//! goes through [`CanvasMutation`]:
//!
//! - `execute` snapshots history first when the mutation is structural, then
//!   applies it. This is the path for discrete user actions.
//! - `apply_mutation` applies without touching history. This is the hot path
//!   for per-frame drag and resize updates, which are bracketed by a gesture
//!   (`begin_gesture` / `commit_gesture`) instead.
//!
//! Every applied change bumps `revision`, which drives reactive saving.

use crate::history::HistoryManager;
use crate::library::Library;
use loom_core::config::CanvasConfig;
use loom_core::geometry::resize_floor;
use loom_core::id::{GroupId, NodeId};
use loom_core::model::*;
use loom_core::viewport::{ScreenSize, Viewport};

/// A change to the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasMutation {
    AddNode {
        node: Box<Node>,
    },
    RemoveNode {
        id: NodeId,
    },
    /// Set the node's top-left corner (world space).
    MoveNode {
        id: NodeId,
        x: f32,
        y: f32,
    },
    /// User resize. The resize floor is applied.
    ResizeNode {
        id: NodeId,
        width: f32,
        height: f32,
    },
    /// Host-measured size written back after layout. No floor.
    MeasureNode {
        id: NodeId,
        width: f32,
        height: f32,
    },
    AddGroup {
        group: Group,
    },
    RemoveGroup {
        id: GroupId,
    },
    /// Translate a group and the members captured at drag start.
    MoveGroup {
        id: GroupId,
        dx: f32,
        dy: f32,
        members: Vec<NodeId>,
    },
    Connect {
        from: NodeId,
        to: NodeId,
    },
    Disconnect {
        from: NodeId,
        to: NodeId,
    },
    ReorderInput {
        id: NodeId,
        from: usize,
        to: usize,
    },
    SetTitle {
        id: NodeId,
        title: String,
    },
    SetData {
        id: NodeId,
        data: Box<NodeData>,
    },
    SetStatus {
        id: NodeId,
        status: NodeStatus,
    },
}

impl CanvasMutation {
    /// Structural mutations are recorded in undo history.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            CanvasMutation::MeasureNode { .. }
                | CanvasMutation::SetTitle { .. }
                | CanvasMutation::SetData { .. }
                | CanvasMutation::SetStatus { .. }
        )
    }
}

/// Current selection. Nodes and groups are selected independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub nodes: Vec<NodeId>,
    pub groups: Vec<GroupId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.groups.clear();
    }
}

pub struct CanvasStore {
    pub scene: Scene,
    pub viewport: Viewport,
    pub screen: ScreenSize,
    pub config: CanvasConfig,
    pub selection: Selection,
    /// Last pointer position in world space (paste target).
    pub last_pointer_world: Point,
    pub library: Library,
    history: HistoryManager,
    clipboard: Option<Node>,
    /// Nodes with a generation call awaiting completion.
    in_flight: Vec<NodeId>,
    revision: u64,
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl CanvasStore {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            scene: Scene::new(),
            viewport: Viewport::default(),
            screen: ScreenSize::default(),
            history: HistoryManager::new(config.history_limit),
            config,
            selection: Selection::default(),
            last_pointer_world: Point::ORIGIN,
            library: Library::default(),
            clipboard: None,
            in_flight: Vec::new(),
            revision: 0,
        }
    }

    pub fn with_scene(scene: Scene, config: CanvasConfig) -> Self {
        let mut store = Self::new(config);
        store.scene = scene;
        store
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Replace the whole scene (startup load, workflow restore). Dangling
    /// edges are swept and history is kept, so the replacement is undoable.
    pub fn replace_scene(&mut self, mut scene: Scene, description: &str) {
        scene.sweep_dangling();
        self.history.snapshot(&self.scene, description);
        self.scene = scene;
        self.reconcile_statuses();
        self.selection.clear();
        self.bump();
    }

    /// Install a loaded scene without recording history.
    pub fn load_scene(&mut self, mut scene: Scene) {
        scene.sweep_dangling();
        self.scene = scene;
        self.reconcile_statuses();
        self.selection.clear();
        self.bump();
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ─── In-flight generations ───────────────────────────────────────────

    pub fn is_in_flight(&self, id: NodeId) -> bool {
        self.in_flight.contains(&id)
    }

    pub(crate) fn mark_in_flight(&mut self, id: NodeId) {
        if !self.is_in_flight(id) {
            self.in_flight.push(id);
        }
    }

    pub(crate) fn clear_in_flight(&mut self, id: NodeId) {
        self.in_flight.retain(|n| *n != id);
    }

    /// Make `WORKING` mirror the in-flight set after the scene was replaced
    /// wholesale. Snapshots and saved scenes can carry a `WORKING` status
    /// whose completion will never arrive, or miss one that is still
    /// pending.
    fn reconcile_statuses(&mut self) {
        for node in &mut self.scene.nodes {
            let pending = self.in_flight.contains(&node.id);
            if pending {
                node.status = NodeStatus::Working;
            } else if node.status == NodeStatus::Working {
                log::debug!("status: {} has no pending generation, reset to idle", node.id);
                node.status = NodeStatus::Idle;
            }
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a discrete user action, snapshotting history first when the
    /// mutation is structural. Returns whether the scene changed.
    pub fn execute(&mut self, mutation: CanvasMutation, description: &str) -> bool {
        if mutation.is_structural() {
            let before = self.scene.clone();
            if !self.apply_mutation(mutation) {
                return false;
            }
            self.history.snapshot(&before, description);
            return true;
        }
        self.apply_mutation(mutation)
    }

    /// Apply without history. Returns whether the scene changed.
    pub fn apply_mutation(&mut self, mutation: CanvasMutation) -> bool {
        let changed = match mutation {
            CanvasMutation::AddNode { node } => {
                if self.scene.contains_node(node.id) {
                    log::warn!("add node: duplicate id {}", node.id);
                    false
                } else {
                    self.scene.add_node(*node);
                    true
                }
            }
            CanvasMutation::RemoveNode { id } => {
                let removed = self.scene.remove_node(id).is_some();
                if removed {
                    self.selection.nodes.retain(|n| *n != id);
                }
                removed
            }
            CanvasMutation::MoveNode { id, x, y } => match self.scene.node_mut(id) {
                Some(node) if node.x != x || node.y != y => {
                    node.x = x;
                    node.y = y;
                    true
                }
                _ => false,
            },
            CanvasMutation::ResizeNode { id, width, height } => {
                let (width, height) = resize_floor(width, height, &self.config);
                set_size(&mut self.scene, id, width, height)
            }
            CanvasMutation::MeasureNode { id, width, height } => {
                set_size(&mut self.scene, id, width, height)
            }
            CanvasMutation::AddGroup { group } => {
                if self.scene.group(group.id).is_some() {
                    false
                } else {
                    self.scene.add_group(group);
                    true
                }
            }
            CanvasMutation::RemoveGroup { id } => {
                let removed = self.scene.remove_group(id).is_some();
                if removed {
                    self.selection.groups.retain(|g| *g != id);
                }
                removed
            }
            CanvasMutation::MoveGroup {
                id,
                dx,
                dy,
                members,
            } => {
                if dx == 0.0 && dy == 0.0 {
                    false
                } else if let Some(group) = self.scene.group_mut(id) {
                    group.x += dx;
                    group.y += dy;
                    for member in members {
                        if let Some(node) = self.scene.node_mut(member) {
                            node.x += dx;
                            node.y += dy;
                        }
                    }
                    true
                } else {
                    false
                }
            }
            CanvasMutation::Connect { from, to } => self.scene.connect(from, to),
            CanvasMutation::Disconnect { from, to } => self.scene.disconnect(from, to),
            CanvasMutation::ReorderInput { id, from, to } => self.scene.reorder_input(id, from, to),
            CanvasMutation::SetTitle { id, title } => match self.scene.node_mut(id) {
                Some(node) if node.title != title => {
                    node.title = title;
                    true
                }
                _ => false,
            },
            CanvasMutation::SetData { id, data } => {
                let Some(node) = self.scene.node_mut(id) else {
                    return false;
                };
                if data.node_type() != node.node_type() {
                    log::warn!(
                        "set data: {} payload rejected for {} node {id}",
                        data.node_type().as_str(),
                        node.node_type().as_str()
                    );
                    false
                } else if node.data == *data {
                    false
                } else {
                    node.data = *data;
                    true
                }
            }
            CanvasMutation::SetStatus { id, status } => match self.scene.node_mut(id) {
                Some(node) if node.status != status => {
                    node.status = status;
                    true
                }
                _ => false,
            },
        };
        if changed {
            self.bump();
        }
        changed
    }

    /// Run several mutations as one undo step. `f` applies them through
    /// `apply_mutation` and reports whether anything changed.
    pub fn batch(&mut self, description: &str, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let before = self.scene.clone();
        let changed = f(self);
        if changed {
            self.history.snapshot(&before, description);
        }
        changed
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    pub fn begin_gesture(&mut self) {
        self.history.begin_gesture(&self.scene);
    }

    pub fn commit_gesture(&mut self, description: &str) -> bool {
        self.history.commit_gesture(&self.scene, description)
    }

    pub fn cancel_gesture(&mut self) {
        self.history.cancel_gesture();
    }

    // ─── Ids ─────────────────────────────────────────────────────────────

    /// A generated node id not present in the scene. Loaded scenes may
    /// already use generated-looking ids.
    pub fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.scene.contains_node(id) {
                return id;
            }
        }
    }

    pub fn fresh_group_id(&self) -> GroupId {
        loop {
            let id = GroupId::generate();
            if self.scene.group(id).is_none() {
                return id;
            }
        }
    }

    // ─── Editing operations ──────────────────────────────────────────────

    /// Create a node of `node_type` with its top-left corner at `at`.
    pub fn create_node(&mut self, node_type: NodeType, at: Point) -> NodeId {
        let id = self.fresh_node_id();
        let node = Node::new(id, node_type, at.x, at.y);
        self.execute(
            CanvasMutation::AddNode {
                node: Box::new(node),
            },
            "add node",
        );
        id
    }

    /// Delete every selected node and group as one undo step. Nodes inside a
    /// deleted group are kept.
    pub fn delete_selection(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let nodes = std::mem::take(&mut self.selection.nodes);
        let groups = std::mem::take(&mut self.selection.groups);
        self.batch("delete selection", |store| {
            let mut changed = false;
            for id in nodes {
                changed |= store.apply_mutation(CanvasMutation::RemoveNode { id });
            }
            for id in groups {
                changed |= store.apply_mutation(CanvasMutation::RemoveGroup { id });
            }
            changed
        })
    }

    pub fn select_all(&mut self) {
        self.selection.nodes = self.scene.nodes.iter().map(|n| n.id).collect();
        self.selection.groups = self.scene.groups.iter().map(|g| g.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Click selection. `additive` toggles the node in or out.
    pub fn select_node(&mut self, id: NodeId, additive: bool) {
        if additive {
            if let Some(pos) = self.selection.nodes.iter().position(|n| *n == id) {
                self.selection.nodes.remove(pos);
            } else {
                self.selection.nodes.push(id);
            }
        } else if !self.selection.nodes.contains(&id) {
            self.selection.nodes = vec![id];
            self.selection.groups.clear();
        }
    }

    pub fn select_group(&mut self, id: GroupId) {
        self.selection.nodes.clear();
        self.selection.groups = vec![id];
    }

    /// Copy the first selected node.
    pub fn copy(&mut self) -> bool {
        let Some(node) = self
            .selection
            .nodes
            .first()
            .and_then(|id| self.scene.node(*id))
        else {
            return false;
        };
        self.clipboard = Some(node.clone());
        true
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Paste the clipboard node at the last pointer position. The copy gets
    /// a fresh id and no inputs; an in-flight status is reset.
    pub fn paste(&mut self) -> Option<NodeId> {
        let mut node = self.clipboard.clone()?;
        node.id = self.fresh_node_id();
        node.x = self.last_pointer_world.x;
        node.y = self.last_pointer_world.y;
        node.inputs.clear();
        if node.status == NodeStatus::Working {
            node.status = NodeStatus::Idle;
        }
        let id = node.id;
        self.execute(
            CanvasMutation::AddNode {
                node: Box::new(node),
            },
            "paste",
        );
        self.selection.nodes = vec![id];
        self.selection.groups.clear();
        Some(id)
    }

    /// Revert the last structural change.
    pub fn undo(&mut self) -> Option<String> {
        let description = self.history.undo(&mut self.scene)?;
        self.reconcile_statuses();
        let scene = &self.scene;
        self.selection.nodes.retain(|id| scene.contains_node(*id));
        self.selection.groups.retain(|id| scene.group(*id).is_some());
        self.bump();
        Some(description)
    }

    /// Save the current scene to the workflow history.
    pub fn save_workflow(&mut self, name: &str) -> String {
        self.library.save_workflow(name, &self.scene)
    }

    /// Replace the scene with a saved workflow (undoable).
    pub fn restore_workflow(&mut self, id: &str) -> bool {
        let Some(scene) = self.library.workflow(id).map(|w| w.scene.clone()) else {
            return false;
        };
        self.replace_scene(scene, "restore workflow");
        true
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn fit_view(&mut self) {
        self.viewport
            .fit_to(&self.scene.nodes, self.screen, &self.config);
    }

    pub fn resize_screen(&mut self, width: f32, height: f32) {
        self.screen = ScreenSize { width, height };
    }
}

fn set_size(scene: &mut Scene, id: NodeId, width: f32, height: f32) -> bool {
    match scene.node_mut(id) {
        Some(node) if node.width != Some(width) || node.height != Some(height) => {
            node.width = Some(width);
            node.height = Some(height);
            true
        }
        _ => false,
    }
}
