//! Asset Server - Frame-driven asset provider
//!
//! The AssetServer answers the [`AssetProvider`] contract from two sources:
//! - resident storage (assets that finished loading or were inserted directly)
//! - a manifest of declared keys that can be fetched on demand
//!
//! Fetches are queued by `load` and completed by `process`, which the owner
//! calls once per frame. Every caller waiting on the same key is completed
//! by a single read.

use std::collections::BTreeMap;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};
use parking_lot::{Mutex, RwLock};

use crate::handle::{AssetHandle, AssetId, AssetKind, LoadState};
use crate::manifest::AssetManifest;
use crate::provider::{AssetError, AssetFuture, AssetProvider, AssetResult};
use crate::storage::AssetStorage;

/// Event from the asset server
#[derive(Clone, Debug, PartialEq)]
pub enum AssetEvent {
    /// Asset finished loading
    Loaded { key: String, id: AssetId },
    /// Asset failed to load
    Failed { key: String, error: AssetError },
}

/// Asset server configuration
#[derive(Clone, Debug)]
pub struct AssetServerConfig {
    /// Base asset directory
    pub asset_dir: String,
}

impl Default for AssetServerConfig {
    fn default() -> Self {
        Self {
            asset_dir: "assets".to_string(),
        }
    }
}

/// Asset metadata recorded on successful loads
#[derive(Clone, Debug, PartialEq)]
pub struct AssetMeta {
    /// Asset ID
    pub id: AssetId,
    /// Resolved file path
    pub path: String,
    /// Asset kind
    pub kind: AssetKind,
    /// File size in bytes
    pub file_size: usize,
    /// Retention hint passed by the requester
    pub cached: bool,
}

/// A queued fetch and everyone waiting on it
struct PendingLoad {
    key: String,
    kind: AssetKind,
    path: String,
    cache: bool,
    waiters: Vec<oneshot::Sender<AssetResult<AssetHandle>>>,
}

/// The main asset server
pub struct AssetServer {
    config: AssetServerConfig,
    storage: AssetStorage,
    manifest: RwLock<AssetManifest>,
    /// Pending fetches in request order
    queue: Mutex<Vec<PendingLoad>>,
    /// Keys whose last fetch failed
    failed: RwLock<BTreeMap<String, AssetError>>,
    meta: RwLock<BTreeMap<String, AssetMeta>>,
    events: Mutex<Vec<AssetEvent>>,
}

impl AssetServer {
    /// Create a new asset server
    pub fn new(config: AssetServerConfig) -> Self {
        Self {
            config,
            storage: AssetStorage::new(),
            manifest: RwLock::new(AssetManifest::new()),
            queue: Mutex::new(Vec::new()),
            failed: RwLock::new(BTreeMap::new()),
            meta: RwLock::new(BTreeMap::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Create with default configuration
    pub fn default_config() -> Self {
        Self::new(AssetServerConfig::default())
    }

    /// Builder-style manifest installation
    pub fn with_manifest(self, manifest: AssetManifest) -> Self {
        self.add_manifest(manifest);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &AssetServerConfig {
        &self.config
    }

    /// Merge declarations into the server's manifest
    pub fn add_manifest(&self, manifest: AssetManifest) {
        self.manifest.write().merge(manifest);
    }

    /// Declare a single fetchable asset
    pub fn declare(&self, key: impl Into<String>, kind: AssetKind, path: impl Into<String>) {
        self.manifest.write().declare(key, kind, path);
    }

    /// Make bytes resident immediately, bypassing the fetch queue
    pub fn insert(&self, key: &str, kind: AssetKind, bytes: Vec<u8>) -> AssetHandle {
        self.storage.store(key, kind, bytes, true)
    }

    /// Current load state of a key
    pub fn state(&self, key: &str) -> LoadState {
        if self.storage.contains(key) {
            LoadState::Loaded
        } else if self.queue.lock().iter().any(|p| p.key == key) {
            LoadState::Loading
        } else if self.failed.read().contains_key(key) {
            LoadState::Failed
        } else {
            LoadState::NotLoaded
        }
    }

    /// Get asset metadata
    pub fn meta(&self, key: &str) -> Option<AssetMeta> {
        self.meta.read().get(key).cloned()
    }

    /// Process pending loads
    ///
    /// Call this each frame. `read_file` receives the resolved path.
    /// Returns the number of fetches completed (successfully or not).
    pub fn process(&self, read_file: impl Fn(&str) -> Option<Vec<u8>>) -> usize {
        let queue: Vec<PendingLoad> = self.queue.lock().drain(..).collect();
        let count = queue.len();

        for pending in queue {
            let result = match read_file(&pending.path) {
                Some(bytes) => {
                    let file_size = bytes.len();
                    let handle = self.storage.store(&pending.key, pending.kind, bytes, pending.cache);

                    self.meta.write().insert(
                        pending.key.clone(),
                        AssetMeta {
                            id: handle.id(),
                            path: pending.path.clone(),
                            kind: pending.kind,
                            file_size,
                            cached: pending.cache,
                        },
                    );
                    self.failed.write().remove(&pending.key);
                    self.events.lock().push(AssetEvent::Loaded {
                        key: pending.key.clone(),
                        id: handle.id(),
                    });
                    log::debug!("Loaded asset '{}' ({} bytes)", pending.key, file_size);
                    Ok(handle)
                }
                None => {
                    let error = AssetError::Read {
                        key: pending.key.clone(),
                        path: pending.path.clone(),
                    };
                    self.failed.write().insert(pending.key.clone(), error.clone());
                    self.events.lock().push(AssetEvent::Failed {
                        key: pending.key.clone(),
                        error: error.clone(),
                    });
                    log::warn!("{}", error);
                    Err(error)
                }
            };

            for waiter in pending.waiters {
                // A dropped receiver means the requester went away.
                let _ = waiter.send(result.clone());
            }
        }

        count
    }

    /// Process pending loads by reading from the filesystem
    pub fn process_from_disk(&self) -> usize {
        self.process(|path| std::fs::read(path).ok())
    }

    /// Drain events
    pub fn drain_events(&self) -> Vec<AssetEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Get pending fetch count
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Get resident asset count
    pub fn resident_count(&self) -> usize {
        self.storage.len()
    }

    fn resolve_path(&self, path: &str) -> String {
        if path.starts_with('/') || path.contains(':') || self.config.asset_dir.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.config.asset_dir, path)
        }
    }
}

impl Default for AssetServer {
    fn default() -> Self {
        Self::default_config()
    }
}

impl AssetProvider for AssetServer {
    fn find(&self, key: &str) -> Option<AssetHandle> {
        self.storage.get(key)
    }

    fn has_declared(&self, key: &str, kind: Option<AssetKind>) -> bool {
        if let Some(handle) = self.storage.get(key) {
            if kind.map_or(true, |k| k == handle.kind()) {
                return true;
            }
        }
        self.manifest
            .read()
            .get(key)
            .map_or(false, |decl| kind.map_or(true, |k| k == decl.kind))
    }

    fn load(&self, key: &str, kind: AssetKind, cache: bool) -> AssetFuture {
        if let Some(handle) = self.storage.get(key) {
            return future::ready(Ok(handle)).boxed_local();
        }

        let decl = match self.manifest.read().get(key).cloned() {
            Some(decl) => decl,
            None => return future::ready(Err(AssetError::NotDeclared(key.to_string()))).boxed_local(),
        };

        if decl.kind != kind {
            return future::ready(Err(AssetError::KindMismatch {
                key: key.to_string(),
                declared: decl.kind,
                requested: kind,
            }))
            .boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.queue.lock();
            match queue.iter_mut().find(|p| p.key == key) {
                Some(pending) => {
                    pending.cache |= cache;
                    pending.waiters.push(tx);
                }
                None => {
                    log::debug!("Queued {} asset '{}'", kind, key);
                    queue.push(PendingLoad {
                        key: key.to_string(),
                        kind,
                        path: self.resolve_path(&decl.path),
                        cache,
                        waiters: vec![tx],
                    });
                }
            }
        }

        let key = key.to_string();
        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(AssetError::Cancelled(key)),
            }
        }
        .boxed_local()
    }
}
