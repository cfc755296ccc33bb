//! Linear undo history.
//!
//! Every entry is a full deep copy of the scene taken *before* a structural
//! mutation, so undo restores the pre-mutation state. There is no redo:
//! entries past the cursor are discarded by the next snapshot.
//!
//! Drag gestures use **snapshot batching** like a command batch: the scene
//! is captured at gesture start and pushed once on release, and only if the
//! gesture actually changed something.

use loom_core::model::Scene;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub scene: Scene,
    pub description: String,
}

pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Number of live entries; `entries[..cursor]` can be undone.
    cursor: usize,
    max_entries: usize,
    /// Scene captured at gesture start.
    gesture: Option<Scene>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_entries),
            cursor: 0,
            max_entries: max_entries.max(1),
            gesture: None,
        }
    }

    /// Push a deep copy of `scene`. Call before applying the mutation.
    pub fn snapshot(&mut self, scene: &Scene, description: &str) {
        self.push(scene.clone(), description);
    }

    fn push(&mut self, scene: Scene, description: &str) {
        self.entries.truncate(self.cursor);
        self.entries.push(HistoryEntry {
            scene,
            description: description.to_string(),
        });
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
        log::debug!("history: snapshot \"{description}\" ({} entries)", self.cursor);
    }

    /// Step back once, replacing `scene` with the stored snapshot. Returns
    /// the description of the undone step.
    pub fn undo(&mut self, scene: &mut Scene) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let entry = &self.entries[self.cursor];
        *scene = entry.scene.clone();
        self.gesture = None;
        log::debug!("history: undo \"{}\"", entry.description);
        Some(entry.description.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Description of the step `undo` would revert.
    pub fn peek(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.entries[i].description.as_str())
    }

    // ─── Gesture batching ────────────────────────────────────────────────

    /// Capture the scene at the start of a drag/resize gesture. A second
    /// call while a gesture is open keeps the first capture.
    pub fn begin_gesture(&mut self, scene: &Scene) {
        if self.gesture.is_none() {
            self.gesture = Some(scene.clone());
        }
    }

    /// Close the gesture. The captured pre-state is pushed only if the scene
    /// changed. Returns whether an entry was pushed.
    pub fn commit_gesture(&mut self, scene: &Scene, description: &str) -> bool {
        let Some(before) = self.gesture.take() else {
            return false;
        };
        if before == *scene {
            return false;
        }
        self.push(before, description);
        true
    }

    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }
}
