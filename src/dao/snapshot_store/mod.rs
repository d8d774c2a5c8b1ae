/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// Local `<sessionId>.snapshot.json` fallback files.
pub mod file;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    config::{BackendKind, EngineConfig},
    dao::{
        models::{SessionRow, SnapshotUpdate},
        storage::{StorageError, StorageResult},
    },
};

/// Durable store consulted before the local file fallback.
pub trait SnapshotBackend: Send + Sync {
    /// Replace the latest snapshot stored for `update.session_id`.
    fn update_snapshot(&self, update: SnapshotUpdate) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the session row, `None` when the session was never stored.
    fn get_session(&self, session_id: &str)
    -> BoxFuture<'static, StorageResult<Option<SessionRow>>>;
}

/// Connect to the durable backend selected by `config.backend` using its settings.
pub async fn connect(config: &EngineConfig) -> StorageResult<Arc<dyn SnapshotBackend>> {
    match config.backend {
        BackendKind::None => Err(StorageError::NotConfigured {
            backend: BackendKind::None.as_str(),
        }),
        BackendKind::Memory => Ok(Arc::new(memory::MemorySnapshotStore::new())),
        #[cfg(feature = "mongo-store")]
        BackendKind::Mongo => {
            let store = mongodb::MongoSnapshotStore::connect(&config.mongo).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "couch-store")]
        BackendKind::Couch => {
            let store = couchdb::CouchSnapshotStore::connect(&config.couch).await?;
            Ok(Arc::new(store))
        }
        #[allow(unreachable_patterns)]
        other => Err(StorageError::NotConfigured {
            backend: other.as_str(),
        }),
    }
}
