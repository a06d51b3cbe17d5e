//! Model lifecycle manager
//!
//! Owns the lifecycle of the expensive resources the inference layer depends
//! on (the embedding model and the vector index client):
//!
//! ```text
//! Uninitialized → Loading → Ready
//!                         ↘ Failed
//! (reload: Ready/Failed → Loading → ...)
//! ```
//!
//! Each resource is published through a `tokio::sync::watch` channel holding
//! a [`ResourceSnapshot`] (status + handle). The manager is the only writer;
//! readers take a cloned snapshot in O(1) and never hold the channel lock
//! across an await, so a reload never blocks an in-flight request and a
//! request never observes a half-committed handle.

use crate::config::FallbackConfig;
use crate::services::embedding_client::EmbeddingModel;
use crate::services::vector_index_client::VectorIndex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flulink_common::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Error recorded when a load exceeds its budget
pub const TIMEOUT_ERROR: &str = "timeout";

/// Error recorded when the task driving a load is dropped before it settles
pub const ABANDONED_ERROR: &str = "load abandoned";

/// Managed resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    EmbeddingModel,
    VectorIndex,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::EmbeddingModel, ResourceKind::VectorIndex];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::EmbeddingModel => "embedding_model",
            ResourceKind::VectorIndex => "vector_index",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "embedding_model" => Ok(ResourceKind::EmbeddingModel),
            "vector_index" => Ok(ResourceKind::VectorIndex),
            other => Err(Error::InvalidInput(format!("Unknown resource: {}", other))),
        }
    }
}

/// Lifecycle state of one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Externally visible status of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub state: LoadState,
    pub last_transition_time: DateTime<Utc>,
    pub last_error: Option<String>,
    pub load_duration_ms: Option<u64>,
}

impl ResourceStatus {
    fn uninitialized() -> Self {
        Self {
            state: LoadState::Uninitialized,
            last_transition_time: Utc::now(),
            last_error: None,
            load_duration_ms: None,
        }
    }

    fn loading() -> Self {
        Self {
            state: LoadState::Loading,
            last_transition_time: Utc::now(),
            last_error: None,
            load_duration_ms: None,
        }
    }

    fn ready(load_duration_ms: u64) -> Self {
        Self {
            state: LoadState::Ready,
            last_transition_time: Utc::now(),
            last_error: None,
            load_duration_ms: Some(load_duration_ms),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            state: LoadState::Failed,
            last_transition_time: Utc::now(),
            last_error: Some(error),
            load_duration_ms: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }
}

/// Status plus handle, published atomically
///
/// Invariant: `handle.is_some()` iff `status.state == Ready`.
pub struct ResourceSnapshot<H: ?Sized> {
    pub status: ResourceStatus,
    pub handle: Option<Arc<H>>,
}

impl<H: ?Sized> Clone for ResourceSnapshot<H> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<H: ?Sized> ResourceSnapshot<H> {
    /// Handle, only if the resource is ready
    pub fn ready_handle(&self) -> Option<Arc<H>> {
        if self.status.is_ready() {
            self.handle.clone()
        } else {
            None
        }
    }
}

/// Construction failure reported by a loader
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

impl LoadError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Builds one resource
///
/// Called on a spawned task; implementations that do blocking work should
/// move it onto `spawn_blocking`. A load that outlives its budget is aborted
/// at its next await point and its result discarded.
#[async_trait]
pub trait ResourceLoader<H: ?Sized + Send + Sync + 'static>: Send + Sync {
    async fn load(&self) -> Result<Arc<H>, LoadError>;
}

/// Loader for a collaborator with no endpoint configured
///
/// Always fails, so the resource settles in `Failed` and the service runs in
/// fallback mode.
#[derive(Debug, Clone)]
pub struct UnconfiguredLoader {
    what: &'static str,
}

impl UnconfiguredLoader {
    pub fn new(what: &'static str) -> Self {
        Self { what }
    }
}

#[async_trait]
impl<H: ?Sized + Send + Sync + 'static> ResourceLoader<H> for UnconfiguredLoader {
    async fn load(&self) -> Result<Arc<H>, LoadError> {
        Err(LoadError::new(format!("{} endpoint not configured", self.what)))
    }
}

/// Marks an in-flight load Failed if it is dropped before committing
struct LoadingGuard<'a, H: ?Sized + Send + Sync + 'static> {
    kind: ResourceKind,
    tx: &'a watch::Sender<ResourceSnapshot<H>>,
    task: Option<tokio::task::AbortHandle>,
    committed: bool,
}

impl<H: ?Sized + Send + Sync + 'static> LoadingGuard<'_, H> {
    fn commit(mut self, status: ResourceStatus, handle: Option<Arc<H>>) {
        self.committed = true;
        self.tx.send_modify(|snap| {
            snap.status = status;
            snap.handle = handle;
        });
    }
}

impl<H: ?Sized + Send + Sync + 'static> Drop for LoadingGuard<'_, H> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        warn!(resource = %self.kind, "Load abandoned before it settled");
        self.tx.send_modify(|snap| {
            snap.status = ResourceStatus::failed(ABANDONED_ERROR.to_string());
            snap.handle = None;
        });
    }
}

/// One managed resource: its loader and its published snapshot
struct ResourceSlot<H: ?Sized + Send + Sync + 'static> {
    kind: ResourceKind,
    loader: Arc<dyn ResourceLoader<H>>,
    tx: watch::Sender<ResourceSnapshot<H>>,
}

impl<H: ?Sized + Send + Sync + 'static> ResourceSlot<H> {
    fn new(kind: ResourceKind, loader: Arc<dyn ResourceLoader<H>>) -> Self {
        let (tx, _rx) = watch::channel(ResourceSnapshot {
            status: ResourceStatus::uninitialized(),
            handle: None,
        });
        Self { kind, loader, tx }
    }

    fn snapshot(&self) -> ResourceSnapshot<H> {
        self.tx.borrow().clone()
    }

    fn status(&self) -> ResourceStatus {
        self.tx.borrow().status.clone()
    }

    async fn load(&self, timeout: Duration) -> ResourceStatus {
        // Check-and-set under the channel lock: only one load runs at a time
        let started_loading = self.tx.send_if_modified(|snap| {
            if snap.status.state == LoadState::Loading {
                return false;
            }
            snap.status = ResourceStatus::loading();
            snap.handle = None;
            true
        });

        if !started_loading {
            debug!(resource = %self.kind, "Load already in progress; not starting another");
            return self.status();
        }

        let mut guard = LoadingGuard {
            kind: self.kind,
            tx: &self.tx,
            task: None,
            committed: false,
        };

        info!(resource = %self.kind, timeout_ms = timeout.as_millis() as u64, "Loading resource");
        let started = Instant::now();

        let loader = Arc::clone(&self.loader);
        let mut task = tokio::spawn(async move { loader.load().await });
        guard.task = Some(task.abort_handle());

        let outcome = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(handle))) => Ok(handle),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(join_err)) => Err(format!("loader task failed: {}", join_err)),
            Err(_) => {
                task.abort();
                Err(TIMEOUT_ERROR.to_string())
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(handle) => {
                guard.commit(ResourceStatus::ready(elapsed_ms), Some(handle));
                info!(resource = %self.kind, load_ms = elapsed_ms, "Resource ready");
            }
            Err(error) => {
                warn!(
                    resource = %self.kind,
                    load_ms = elapsed_ms,
                    error = %error,
                    "Resource failed to load; requests will use the fallback path"
                );
                guard.commit(ResourceStatus::failed(error), None);
            }
        }

        self.status()
    }

    async fn wait_until_settled(&self) -> ResourceStatus {
        let mut rx = self.tx.subscribe();
        // Bound so the watch::Ref borrowing `rx` is released before `rx` drops
        let settled = match rx.wait_for(|snap| snap.status.state != LoadState::Loading).await {
            Ok(snap) => snap.status.clone(),
            // Sender lives as long as self; unreachable in practice
            Err(_) => self.status(),
        };
        settled
    }
}

/// Registry of managed resources
///
/// One instance per process, shared via `Arc` with every component that needs
/// to know whether a resource is usable.
pub struct ModelLifecycleManager {
    config: FallbackConfig,
    embedding: ResourceSlot<dyn EmbeddingModel>,
    index: ResourceSlot<dyn VectorIndex>,
}

impl ModelLifecycleManager {
    pub fn new(
        config: FallbackConfig,
        embedding_loader: Arc<dyn ResourceLoader<dyn EmbeddingModel>>,
        index_loader: Arc<dyn ResourceLoader<dyn VectorIndex>>,
    ) -> Self {
        Self {
            config,
            embedding: ResourceSlot::new(ResourceKind::EmbeddingModel, embedding_loader),
            index: ResourceSlot::new(ResourceKind::VectorIndex, index_loader),
        }
    }

    /// Manager whose resources can never load (fallback-only service)
    pub fn unconfigured(config: FallbackConfig) -> Self {
        Self::new(
            config,
            Arc::new(UnconfiguredLoader::new("embedding model")),
            Arc::new(UnconfiguredLoader::new("vector index")),
        )
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Configured load budget for `kind`
    pub fn load_timeout(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::EmbeddingModel => self.config.model_load_timeout,
            ResourceKind::VectorIndex => self.config.index_init_timeout,
        }
    }

    /// Load `kind` within `timeout`
    ///
    /// No-op returning the current status if a load is already in progress.
    pub async fn load_resource(&self, kind: ResourceKind, timeout: Duration) -> ResourceStatus {
        match kind {
            ResourceKind::EmbeddingModel => self.embedding.load(timeout).await,
            ResourceKind::VectorIndex => self.index.load(timeout).await,
        }
    }

    /// Load every resource in parallel, each within its own budget
    pub async fn initialize(&self) -> BTreeMap<ResourceKind, ResourceStatus> {
        info!("Initializing inference resources");
        let (embedding, index) = tokio::join!(
            self.load_resource(
                ResourceKind::EmbeddingModel,
                self.load_timeout(ResourceKind::EmbeddingModel)
            ),
            self.load_resource(
                ResourceKind::VectorIndex,
                self.load_timeout(ResourceKind::VectorIndex)
            ),
        );

        let statuses = BTreeMap::from([
            (ResourceKind::EmbeddingModel, embedding),
            (ResourceKind::VectorIndex, index),
        ]);

        let ready = statuses.values().filter(|s| s.is_ready()).count();
        info!(ready, total = statuses.len(), "Inference resource initialization finished");
        statuses
    }

    /// Start a background reload of `kind`; returns immediately
    pub fn reload(self: &Arc<Self>, kind: ResourceKind) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            info!(resource = %kind, "Manual reload requested");
            let timeout = manager.load_timeout(kind);
            manager.load_resource(kind, timeout).await;
        });
    }

    /// Start a background reload of every resource; returns immediately
    pub fn reload_all(self: &Arc<Self>) {
        for kind in ResourceKind::ALL {
            self.reload(kind);
        }
    }

    pub fn resource_status(&self, kind: ResourceKind) -> ResourceStatus {
        match kind {
            ResourceKind::EmbeddingModel => self.embedding.status(),
            ResourceKind::VectorIndex => self.index.status(),
        }
    }

    pub fn all_statuses(&self) -> BTreeMap<ResourceKind, ResourceStatus> {
        ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.resource_status(kind)))
            .collect()
    }

    /// True when every resource is ready
    pub fn all_ready(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .all(|kind| self.resource_status(kind).is_ready())
    }

    pub fn embedding_snapshot(&self) -> ResourceSnapshot<dyn EmbeddingModel> {
        self.embedding.snapshot()
    }

    pub fn index_snapshot(&self) -> ResourceSnapshot<dyn VectorIndex> {
        self.index.snapshot()
    }

    /// Wait until `kind` is not `Loading`
    pub async fn wait_until_settled(&self, kind: ResourceKind) -> ResourceStatus {
        match kind {
            ResourceKind::EmbeddingModel => self.embedding.wait_until_settled().await,
            ResourceKind::VectorIndex => self.index.wait_until_settled().await,
        }
    }
}
