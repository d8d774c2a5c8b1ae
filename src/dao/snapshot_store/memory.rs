use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    models::{SessionRow, SnapshotUpdate},
    snapshot_store::SnapshotBackend,
    storage::StorageResult,
};

/// Process-local durable backend keyed by session id.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    sessions: Arc<DashMap<String, SnapshotUpdate>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions stored.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Last update received for `session_id`.
    pub fn latest(&self, session_id: &str) -> Option<SnapshotUpdate> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }
}

impl SnapshotBackend for MemorySnapshotStore {
    fn update_snapshot(&self, update: SnapshotUpdate) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            sessions.insert(update.session_id.clone(), update);
            Ok(())
        })
    }

    fn get_session(
        &self,
        session_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionRow>>> {
        let row = self.sessions.get(session_id).map(|entry| SessionRow {
            session_id: entry.key().clone(),
            latest_snapshot: Some(entry.value().snapshot.clone()),
        });
        Box::pin(async move { Ok(row) })
    }
}
