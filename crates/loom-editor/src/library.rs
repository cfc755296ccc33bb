//! Workflow and asset history.
//!
//! Workflows are named copies of the whole scene; assets are the media a
//! generation produced. Both lists are persisted under their own keys and
//! carry a revision so the auto-saver only writes them when they change.

use loom_core::id::NodeId;
use loom_core::model::{MediaRef, NodeType, Scene};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: String,
    pub name: String,
    /// Unix seconds.
    pub saved_at: u64,
    pub scene: Scene,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub node: NodeId,
    pub node_type: NodeType,
    pub prompt: String,
    pub media: MediaRef,
    pub created_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    pub workflows: Vec<WorkflowRecord>,
    pub assets: Vec<AssetRecord>,
    revision: u64,
}

impl Library {
    pub fn new(workflows: Vec<WorkflowRecord>, assets: Vec<AssetRecord>) -> Self {
        Self {
            workflows,
            assets,
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Store a copy of `scene` under `name`, newest first. Returns the
    /// workflow id.
    pub fn save_workflow(&mut self, name: &str, scene: &Scene) -> String {
        let saved_at = unix_now();
        let id = format!("wf_{saved_at}_{}", self.revision);
        self.workflows.insert(
            0,
            WorkflowRecord {
                id: id.clone(),
                name: name.to_string(),
                saved_at,
                scene: scene.clone(),
            },
        );
        self.revision += 1;
        log::debug!("library: saved workflow \"{name}\" as {id}");
        id
    }

    pub fn workflow(&self, id: &str) -> Option<&WorkflowRecord> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn delete_workflow(&mut self, id: &str) -> bool {
        let before = self.workflows.len();
        self.workflows.retain(|w| w.id != id);
        let removed = self.workflows.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// Append generated media, newest first.
    pub fn record_assets(&mut self, node: NodeId, node_type: NodeType, prompt: &str, media: &[MediaRef]) {
        if media.is_empty() {
            return;
        }
        let created_at = unix_now();
        for m in media.iter().rev() {
            self.assets.insert(
                0,
                AssetRecord {
                    node,
                    node_type,
                    prompt: prompt.to_string(),
                    media: m.clone(),
                    created_at,
                },
            );
        }
        self.revision += 1;
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
