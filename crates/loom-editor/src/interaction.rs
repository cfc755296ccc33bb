//! Pointer and keyboard interaction state machine.
//!
//! A gesture starts on pointer-down according to what lies under the
//! pointer and is resolved on pointer-up, wherever the pointer is by then.
//! The host is expected to forward releases that happen outside the canvas
//! element.
//!
//! ## Pointer mapping
//!
//! | Target on pointer-down | Button | Mode |
//! |------------------------|--------|------|
//! | anything | middle | `Panning` |
//! | empty canvas | left + Shift | `Panning` |
//! | empty canvas | left | `Selecting` (marquee) |
//! | node body | left | `DraggingNode` |
//! | resize handle | left | `ResizingNode` |
//! | port | left | `Connecting` |
//! | group body | left | `DraggingGroup` |

use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::{CanvasMutation, CanvasStore};
use loom_core::collision::resolve_collisions;
use loom_core::geometry::bounds_of;
use loom_core::groups::{auto_group_bounds, free_nodes, members_of, nodes_with_center_in};
use loom_core::hit::{HitTarget, PortSide, hit_test};
use loom_core::id::{GroupId, NodeId};
use loom_core::model::{Bounds, Group, Point};
use loom_core::snap::snap_bounds;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    /// `last` is the previous screen position.
    Panning { last: Point },
    /// Marquee corners in screen space.
    Selecting { start: Point, current: Point },
    /// `grab` is the pointer offset from the node's top-left (world).
    DraggingNode { id: NodeId, grab: Point },
    /// Members are captured once at drag start.
    DraggingGroup {
        id: GroupId,
        last: Point,
        members: Vec<NodeId>,
    },
    ResizingNode { id: NodeId },
    /// `cursor` is the live end of the preview wire (world).
    Connecting {
        from: NodeId,
        side: PortSide,
        cursor: Point,
    },
}

/// Alignment guides to draw while a node is dragged (world coordinates).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Guides {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

#[derive(Debug)]
pub struct InteractionController {
    mode: Mode,
    guides: Guides,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            guides: Guides::default(),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn guides(&self) -> Guides {
        self.guides
    }

    /// Live marquee rectangle in screen space.
    pub fn marquee_rect(&self) -> Option<Bounds> {
        match &self.mode {
            Mode::Selecting { start, current } => Some(Bounds::from_corners(*start, *current)),
            _ => None,
        }
    }

    /// Preview wire endpoints in world space, oriented `from → to`.
    pub fn connection_preview(&self, store: &CanvasStore) -> Option<(Point, Point)> {
        let Mode::Connecting { from, side, cursor } = &self.mode else {
            return None;
        };
        let node = store.scene.node(*from)?;
        let anchor = loom_core::hit::port_position(node, *side);
        Some(match side {
            PortSide::Output => (anchor, *cursor),
            PortSide::Input => (*cursor, anchor),
        })
    }

    /// Feed one input event. Returns `true` when the host should redraw.
    pub fn handle(&mut self, store: &mut CanvasStore, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(store, Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(store, Point::new(*x, *y)),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(store, Point::new(*x, *y)),
            InputEvent::Wheel {
                x,
                y,
                dx,
                dy,
                modifiers,
            } => {
                if modifiers.command() {
                    store
                        .viewport
                        .zoom_at(Point::new(*x, *y), *dy, &store.config);
                } else {
                    store.viewport.pan_by(-dx, -dy);
                }
                true
            }
            InputEvent::Key {
                key,
                modifiers,
                in_text_input,
            } => match ShortcutMap::resolve(key, *modifiers, *in_text_input) {
                Some(action) => self.run_action(store, action),
                None => false,
            },
        }
    }

    /// Run a shortcut action against the store.
    pub fn run_action(&mut self, store: &mut CanvasStore, action: ShortcutAction) -> bool {
        log::debug!("shortcut: {action:?}");
        match action {
            ShortcutAction::Delete => store.delete_selection(),
            ShortcutAction::Undo => {
                // An open gesture refers to the scene being replaced.
                self.abort(store);
                store.undo().is_some()
            }
            ShortcutAction::Copy => {
                store.copy();
                false
            }
            ShortcutAction::Paste => store.paste().is_some(),
            ShortcutAction::SelectAll => {
                store.select_all();
                true
            }
            ShortcutAction::Deselect => {
                self.abort(store);
                store.clear_selection();
                true
            }
            ShortcutAction::FitView => {
                store.fit_view();
                true
            }
        }
    }

    /// Drop the current gesture without committing it.
    fn abort(&mut self, store: &mut CanvasStore) {
        if self.mode != Mode::Idle {
            log::debug!("interaction: abort {:?}", self.mode);
        }
        store.cancel_gesture();
        self.mode = Mode::Idle;
        self.guides = Guides::default();
    }

    // ─── Pointer down ────────────────────────────────────────────────────

    fn pointer_down(
        &mut self,
        store: &mut CanvasStore,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> bool {
        if self.mode != Mode::Idle {
            return false;
        }
        let world = store.viewport.screen_to_world(screen.x, screen.y);
        store.last_pointer_world = world;

        match button {
            PointerButton::Middle => {
                self.mode = Mode::Panning { last: screen };
                return false;
            }
            PointerButton::Right => return false,
            PointerButton::Left => {}
        }

        let hit = hit_test(&store.scene, world, store.viewport.scale, &store.config);
        log::trace!("pointer down at {world:?}: {hit:?}");
        match hit {
            Some(HitTarget::Port { node, side }) => {
                self.mode = Mode::Connecting {
                    from: node,
                    side,
                    cursor: world,
                };
            }
            Some(HitTarget::ResizeHandle(id)) => {
                store.select_node(id, false);
                store.begin_gesture();
                self.mode = Mode::ResizingNode { id };
            }
            Some(HitTarget::Node(id)) => {
                store.select_node(id, modifiers.shift);
                let Some(node) = store.scene.node(id) else {
                    return true;
                };
                let grab = Point::new(world.x - node.x, world.y - node.y);
                store.begin_gesture();
                self.mode = Mode::DraggingNode { id, grab };
            }
            Some(HitTarget::Group(id)) => {
                store.select_group(id);
                let Some(group) = store.scene.group(id) else {
                    return true;
                };
                let members = members_of(&store.scene, group);
                log::debug!("group drag: {id} with {} members", members.len());
                store.begin_gesture();
                self.mode = Mode::DraggingGroup {
                    id,
                    last: world,
                    members,
                };
            }
            None if modifiers.shift => {
                self.mode = Mode::Panning { last: screen };
                return false;
            }
            None => {
                store.clear_selection();
                self.mode = Mode::Selecting {
                    start: screen,
                    current: screen,
                };
            }
        }
        true
    }

    // ─── Pointer move ────────────────────────────────────────────────────

    fn pointer_move(&mut self, store: &mut CanvasStore, screen: Point) -> bool {
        let world = store.viewport.screen_to_world(screen.x, screen.y);
        store.last_pointer_world = world;

        match &mut self.mode {
            Mode::Idle => false,
            Mode::Panning { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                store.viewport.pan_by(dx, dy);
                true
            }
            Mode::Selecting { current, .. } => {
                *current = screen;
                true
            }
            Mode::DraggingNode { id, grab } => {
                let (id, grab) = (*id, *grab);
                let Some(node) = store.scene.node(id) else {
                    return false;
                };
                let proposed =
                    bounds_of(node).with_origin(world.x - grab.x, world.y - grab.y);
                let others: Vec<Bounds> = store
                    .scene
                    .nodes
                    .iter()
                    .filter(|n| n.id != id)
                    .map(bounds_of)
                    .collect();
                let snapped = snap_bounds(proposed, &others, store.viewport.scale, &store.config);
                self.guides = Guides {
                    x: snapped.guide_x,
                    y: snapped.guide_y,
                };
                store.apply_mutation(CanvasMutation::MoveNode {
                    id,
                    x: snapped.bounds.x,
                    y: snapped.bounds.y,
                });
                true
            }
            Mode::DraggingGroup { id, last, members } => {
                let (dx, dy) = (world.x - last.x, world.y - last.y);
                *last = world;
                store.apply_mutation(CanvasMutation::MoveGroup {
                    id: *id,
                    dx,
                    dy,
                    members: members.clone(),
                });
                true
            }
            Mode::ResizingNode { id } => {
                let id = *id;
                let Some(node) = store.scene.node(id) else {
                    return false;
                };
                let (width, height) = (world.x - node.x, world.y - node.y);
                store.apply_mutation(CanvasMutation::ResizeNode { id, width, height });
                true
            }
            Mode::Connecting { cursor, .. } => {
                *cursor = world;
                true
            }
        }
    }

    // ─── Pointer up ──────────────────────────────────────────────────────

    fn pointer_up(&mut self, store: &mut CanvasStore, screen: Point) -> bool {
        let world = store.viewport.screen_to_world(screen.x, screen.y);
        store.last_pointer_world = world;
        self.guides = Guides::default();

        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => false,
            Mode::Panning { .. } => false,
            Mode::Selecting { start, .. } => self.finish_marquee(store, start, screen),
            Mode::DraggingNode { id, .. } => {
                drop_node(store, id);
                store.commit_gesture("move node");
                true
            }
            Mode::DraggingGroup { .. } => {
                store.commit_gesture("move group");
                true
            }
            Mode::ResizingNode { .. } => {
                store.commit_gesture("resize node");
                true
            }
            Mode::Connecting { from, side, .. } => {
                let hit = hit_test(&store.scene, world, store.viewport.scale, &store.config);
                let Some(HitTarget::Port {
                    node: target,
                    side: target_side,
                }) = hit
                else {
                    return true;
                };
                // output-to-input only, never a self edge
                if target == from || target_side == side {
                    log::trace!("connect: rejected drop on {target} ({target_side:?})");
                    return true;
                }
                let (src, dst) = match side {
                    PortSide::Output => (from, target),
                    PortSide::Input => (target, from),
                };
                store.execute(CanvasMutation::Connect { from: src, to: dst }, "connect");
                true
            }
        }
    }

    /// Select enclosed node centers; a wide enough marquee also wraps the
    /// enclosed free nodes in a new group.
    fn finish_marquee(&mut self, store: &mut CanvasStore, start: Point, end: Point) -> bool {
        let screen_rect = Bounds::from_corners(start, end);
        let world_rect = store.viewport.screen_rect_to_world(screen_rect);
        let enclosed = nodes_with_center_in(&store.scene, world_rect);
        store.selection.nodes = enclosed.clone();

        if screen_rect.width <= store.config.marquee_min_width || enclosed.is_empty() {
            return true;
        }
        let free = free_nodes(&store.scene, &enclosed);
        let Some(bounds) = auto_group_bounds(&store.scene, &free, store.config.group_padding)
        else {
            return true;
        };
        let id = store.fresh_group_id();
        log::debug!("auto-group: {id} wraps {} free nodes", free.len());
        store.execute(
            CanvasMutation::AddGroup {
                group: Group::new(id, bounds),
            },
            "group nodes",
        );
        true
    }
}

/// Push a released node off any overlapped neighbour.
fn drop_node(store: &mut CanvasStore, id: NodeId) {
    let Some(node) = store.scene.node(id) else {
        return;
    };
    let dropped = bounds_of(node);
    let others: Vec<(NodeId, Bounds)> = store
        .scene
        .nodes
        .iter()
        .filter(|n| n.id != id)
        .map(|n| (n.id, bounds_of(n)))
        .collect();
    let outcome = resolve_collisions(dropped, &others, &store.config);
    if outcome.moved() {
        store.apply_mutation(CanvasMutation::MoveNode {
            id,
            x: outcome.bounds.x,
            y: outcome.bounds.y,
        });
    }
}
