//! Persistence collaborator.
//!
//! The scene is stored as separate collections under fixed keys, each
//! encoded as MessagePack. Loading happens once at startup; saving happens
//! after every mutation batch that moved the store revision. Every failure
//! is logged and swallowed at this boundary: the in-memory store stays
//! authoritative.

use crate::library::{AssetRecord, Library, WorkflowRecord};
use crate::store::CanvasStore;
use loom_core::model::{Connection, Group, Node, Scene};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

pub const KEY_NODES: &str = "nodes";
pub const KEY_CONNECTIONS: &str = "connections";
pub const KEY_GROUPS: &str = "groups";
pub const KEY_WORKFLOWS: &str = "workflows";
pub const KEY_ASSETS: &str = "assets";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage I/O for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("encoding `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: rmp_serde::encode::Error,
    },
    #[error("decoding `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: rmp_serde::decode::Error,
    },
}

// ─── Storage backends ────────────────────────────────────────────────────

/// Async key → bytes store.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// `Ok(None)` when nothing has been stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), PersistError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Overwrite raw bytes (tests use this to plant corrupt data).
    pub async fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        self.entries.lock().await.insert(key.to_string(), bytes);
    }
}

impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), PersistError> {
        self.entries.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

/// One `<key>.msgpack` file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.msgpack"))
    }
}

impl Storage for FsStorage {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), PersistError> {
        let io_err = |source| PersistError::Io {
            key: key.to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.root).await.map_err(io_err)?;
        tokio::fs::write(self.path(key), bytes).await.map_err(io_err)
    }
}

// ─── Typed persistence ───────────────────────────────────────────────────

/// Everything read at startup.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub scene: Scene,
    pub workflows: Vec<WorkflowRecord>,
    pub assets: Vec<AssetRecord>,
}

impl LoadedState {
    /// Install into a store.
    pub fn install(self, store: &mut CanvasStore) {
        store.load_scene(self.scene);
        store.library = Library::new(self.workflows, self.assets);
    }
}

pub struct Persistence<S> {
    storage: S,
}

impl<S: Storage> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistError> {
        let Some(bytes) = self.storage.load(key).await? else {
            return Ok(None);
        };
        rmp_serde::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistError::Decode {
                key: key.to_string(),
                source,
            })
    }

    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistError> {
        let bytes = rmp_serde::to_vec_named(value).map_err(|source| PersistError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.storage.save(key, bytes).await
    }

    /// Load one key, falling back to an empty value on absence or failure.
    async fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.load(key).await {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                log::warn!("persistence: {e}; starting with empty `{key}`");
                T::default()
            }
        }
    }

    /// Read every key. Never fails; the scene is swept of dangling edges.
    pub async fn load_all(&self) -> LoadedState {
        let nodes: Vec<Node> = self.load_or_default(KEY_NODES).await;
        let connections: Vec<Connection> = self.load_or_default(KEY_CONNECTIONS).await;
        let groups: Vec<Group> = self.load_or_default(KEY_GROUPS).await;
        let mut scene = Scene {
            nodes,
            connections,
            groups,
        };
        scene.sweep_dangling();
        log::debug!(
            "persistence: loaded {} nodes, {} connections, {} groups",
            scene.nodes.len(),
            scene.connections.len(),
            scene.groups.len()
        );
        LoadedState {
            scene,
            workflows: self.load_or_default(KEY_WORKFLOWS).await,
            assets: self.load_or_default(KEY_ASSETS).await,
        }
    }

    pub async fn save_scene(&self, scene: &Scene) -> Result<(), PersistError> {
        self.save(KEY_NODES, &scene.nodes).await?;
        self.save(KEY_CONNECTIONS, &scene.connections).await?;
        self.save(KEY_GROUPS, &scene.groups).await
    }

    pub async fn save_library(&self, library: &Library) -> Result<(), PersistError> {
        self.save(KEY_WORKFLOWS, &library.workflows).await?;
        self.save(KEY_ASSETS, &library.assets).await
    }
}

// ─── Auto-save ───────────────────────────────────────────────────────────

/// Copy of the persisted state taken synchronously from the store, so no
/// borrow of the store is held across an await.
#[derive(Debug, Clone)]
pub struct SavePoint {
    revision: u64,
    scene: Option<Scene>,
    library_revision: u64,
    library: Option<Library>,
}

/// Tracks which revisions were written and saves only what changed.
#[derive(Debug, Default)]
pub struct AutoSaver {
    saved_revision: Option<u64>,
    saved_library_revision: Option<u64>,
}

impl AutoSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the state just loaded as already persisted.
    pub fn mark_saved(&mut self, store: &CanvasStore) {
        self.saved_revision = Some(store.revision());
        self.saved_library_revision = Some(store.library.revision());
    }

    /// `None` when nothing changed since the last successful save.
    pub fn save_point(&self, store: &CanvasStore) -> Option<SavePoint> {
        let scene_dirty = self.saved_revision != Some(store.revision());
        let library_dirty = self.saved_library_revision != Some(store.library.revision());
        if !scene_dirty && !library_dirty {
            return None;
        }
        Some(SavePoint {
            revision: store.revision(),
            scene: scene_dirty.then(|| store.scene.clone()),
            library_revision: store.library.revision(),
            library: library_dirty.then(|| store.library.clone()),
        })
    }

    /// Write a save point. Failures are logged and leave the revision
    /// unsaved so the next batch retries. Returns whether everything in the
    /// save point was written.
    pub async fn flush<S: Storage>(&mut self, persistence: &Persistence<S>, point: SavePoint) -> bool {
        let mut ok = true;
        if let Some(scene) = &point.scene {
            match persistence.save_scene(scene).await {
                Ok(()) => self.saved_revision = Some(point.revision),
                Err(e) => {
                    log::warn!("persistence: scene save failed: {e}");
                    ok = false;
                }
            }
        }
        if let Some(library) = &point.library {
            match persistence.save_library(library).await {
                Ok(()) => self.saved_library_revision = Some(point.library_revision),
                Err(e) => {
                    log::warn!("persistence: library save failed: {e}");
                    ok = false;
                }
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::id::NodeId;
    use loom_core::model::{NodeType, Point};
    use pretty_assertions::assert_eq;

    /// Storage whose writes always fail.
    struct ReadOnly;

    impl Storage for ReadOnly {
        async fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistError> {
            Ok(None)
        }

        async fn save(&self, key: &str, _bytes: Vec<u8>) -> Result<(), PersistError> {
            Err(PersistError::Io {
                key: key.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[tokio::test]
    async fn empty_storage_loads_empty_state() {
        let p = Persistence::new(MemoryStorage::new());
        let state = p.load_all().await;
        assert_eq!(state.scene, Scene::new());
        assert!(state.workflows.is_empty());
        assert!(state.assets.is_empty());
    }

    #[tokio::test]
    async fn scene_survives_a_save_load_cycle() {
        let p = Persistence::new(MemoryStorage::new());
        let mut store = CanvasStore::default();
        let a = store.create_node(NodeType::PromptInput, Point::ORIGIN);
        let b = store.create_node(NodeType::VideoGenerator, Point::new(600.0, 0.0));
        store.scene.connect(a, b);

        p.save_scene(&store.scene).await.unwrap();
        assert_eq!(
            p.storage().keys().await,
            vec!["connections", "groups", "nodes"]
        );
        let loaded = p.load_all().await;
        assert_eq!(loaded.scene, store.scene);
    }

    #[tokio::test]
    async fn corrupt_key_falls_back_to_empty() {
        let storage = MemoryStorage::new();
        storage.put_raw(KEY_NODES, vec![0xc1, 0xff, 0x00]).await;
        let p = Persistence::new(storage);
        let state = p.load_all().await;
        assert!(state.scene.nodes.is_empty());
    }

    #[tokio::test]
    async fn dangling_connections_are_swept_on_load() {
        let p = Persistence::new(MemoryStorage::new());
        let a = Node::new(NodeId::intern("p_a"), NodeType::PromptInput, 0.0, 0.0);
        let ghost = NodeId::intern("p_ghost");
        p.save(KEY_NODES, &vec![a.clone()]).await.unwrap();
        p.save(KEY_CONNECTIONS, &vec![Connection::new(ghost, a.id)])
            .await
            .unwrap();

        let state = p.load_all().await;
        assert_eq!(state.scene.nodes.len(), 1);
        assert!(state.scene.connections.is_empty());
    }

    #[tokio::test]
    async fn auto_saver_writes_only_on_revision_change() {
        let p = Persistence::new(MemoryStorage::new());
        let mut saver = AutoSaver::new();
        let mut store = CanvasStore::default();
        saver.mark_saved(&store);
        assert!(saver.save_point(&store).is_none());

        store.create_node(NodeType::PromptInput, Point::ORIGIN);
        let point = saver.save_point(&store).unwrap();
        assert!(saver.flush(&p, point).await);
        assert!(saver.save_point(&store).is_none());
        assert_eq!(p.load_all().await.scene.nodes.len(), 1);
    }

    #[tokio::test]
    async fn failed_save_is_retried() {
        let p = Persistence::new(ReadOnly);
        let mut saver = AutoSaver::new();
        let mut store = CanvasStore::default();
        store.create_node(NodeType::PromptInput, Point::ORIGIN);

        let point = saver.save_point(&store).unwrap();
        assert!(!saver.flush(&p, point).await);
        assert!(saver.save_point(&store).is_some());
    }

    #[tokio::test]
    async fn fs_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("loom-persist-{}", std::process::id()));
        let storage = FsStorage::new(&dir);
        assert_eq!(storage.load("missing").await.unwrap(), None);
        storage.save("blob", vec![1, 2, 3]).await.unwrap();
        assert_eq!(storage.load("blob").await.unwrap(), Some(vec![1, 2, 3]));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
