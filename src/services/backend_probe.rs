use std::{future::Future, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    config::{BackendKind, EngineConfig},
    dao::{
        snapshot_store::{self, SnapshotBackend},
        storage::StorageResult,
    },
};

type Connector =
    Box<dyn Fn() -> BoxFuture<'static, StorageResult<Arc<dyn SnapshotBackend>>> + Send + Sync>;

/// Observable state of a [`BackendProbe`].
#[derive(Clone)]
pub enum BackendState {
    /// No operation has needed the backend yet.
    Unresolved,
    /// The backend was reached and is used for every call.
    Available(Arc<dyn SnapshotBackend>),
    /// The backend could not be reached; only the file fallback is used.
    Unavailable,
}

impl BackendState {
    /// Short name for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Unresolved => "unresolved",
            BackendState::Available(_) => "available",
            BackendState::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Debug for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the optional durable backend, resolved at most once.
///
/// The first operation that needs the backend runs the connector; its outcome is kept
/// for the lifetime of the probe, so an outage seen at resolution time is never
/// re-checked.
pub struct BackendProbe {
    resolved: OnceCell<Option<Arc<dyn SnapshotBackend>>>,
    connector: Option<Connector>,
}

impl BackendProbe {
    /// Probe that runs `connect` on first use.
    pub fn lazy<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StorageResult<Arc<dyn SnapshotBackend>>> + Send + 'static,
    {
        Self {
            resolved: OnceCell::new(),
            connector: Some(Box::new(move || connect().boxed())),
        }
    }

    /// Probe that connects to the backend selected by `config` on first use.
    pub fn for_config(config: &EngineConfig) -> Self {
        if config.backend == BackendKind::None {
            return Self::unavailable();
        }
        let config = Arc::new(config.clone());
        Self::lazy(move || {
            let config = config.clone();
            async move { snapshot_store::connect(&config).await }
        })
    }

    /// Probe already resolved to `backend`.
    pub fn available(backend: Arc<dyn SnapshotBackend>) -> Self {
        Self {
            resolved: OnceCell::new_with(Some(Some(backend))),
            connector: None,
        }
    }

    /// Probe already resolved to file-only mode.
    pub fn unavailable() -> Self {
        Self {
            resolved: OnceCell::new_with(Some(None)),
            connector: None,
        }
    }

    /// Current state without triggering resolution.
    pub fn state(&self) -> BackendState {
        match self.resolved.get() {
            None => BackendState::Unresolved,
            Some(Some(backend)) => BackendState::Available(backend.clone()),
            Some(None) => BackendState::Unavailable,
        }
    }

    /// Resolve the backend, connecting on the first call only.
    pub async fn resolve(&self) -> Option<Arc<dyn SnapshotBackend>> {
        self.resolved
            .get_or_init(|| async {
                let Some(connect) = self.connector.as_ref() else {
                    return None;
                };
                match connect().await {
                    Ok(backend) => {
                        info!("durable snapshot backend available");
                        Some(backend)
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            "durable snapshot backend unavailable; using file fallback"
                        );
                        None
                    }
                }
            })
            .await
            .clone()
    }
}
