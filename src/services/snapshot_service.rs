use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    dao::{
        models::{LoadedSnapshot, Snapshot, SnapshotUpdate, StoredRecord, is_valid_session_id},
        snapshot_store::file::FileSnapshotStore,
    },
    error::ServiceError,
    services::backend_probe::{BackendProbe, BackendState},
};

/// Where a save ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Stored by the durable backend; no file was written.
    Durable,
    /// Stored in the fallback file at `path`.
    Fallback {
        /// Snapshot file that was written.
        path: PathBuf,
    },
}

/// Stores the latest snapshot of each session, preferring the durable backend and
/// falling back to one file per session.
pub struct SnapshotService {
    backend: BackendProbe,
    files: FileSnapshotStore,
}

impl SnapshotService {
    /// Service using `backend` with fallback files under `data_dir`.
    pub fn new(backend: BackendProbe, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            files: FileSnapshotStore::new(data_dir),
        }
    }

    /// Service wired from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(BackendProbe::for_config(config), &config.data_dir)
    }

    /// Directory holding fallback snapshot files.
    pub fn data_dir(&self) -> &Path {
        self.files.dir()
    }

    /// Current durable backend state, without probing it.
    pub fn backend_state(&self) -> BackendState {
        self.backend.state()
    }

    /// Probe the durable backend if no operation has done so yet and report the outcome.
    pub async fn resolve_backend(&self) -> BackendState {
        self.backend.resolve().await;
        self.backend.state()
    }

    /// Store `snapshot` as the latest state of `session_id`.
    ///
    /// Durable backend failures fall through to the file fallback; only a failing
    /// filesystem makes the save fail.
    pub async fn persist_snapshot(
        &self,
        session_id: &str,
        snapshot: Snapshot,
    ) -> Result<PersistOutcome, ServiceError> {
        ensure_session_id(session_id)?;

        if let Some(backend) = self.backend.resolve().await {
            let update = SnapshotUpdate::from_snapshot(session_id, snapshot.clone());
            match backend.update_snapshot(update).await {
                Ok(()) => {
                    debug!(session_id, "snapshot stored in durable backend");
                    return Ok(PersistOutcome::Durable);
                }
                Err(err) => {
                    warn!(
                        session_id,
                        error = %err,
                        "durable snapshot write failed; writing fallback file"
                    );
                }
            }
        }

        let path = self
            .files
            .write(&StoredRecord::new(session_id, snapshot))
            .await?;
        debug!(session_id, path = %path.display(), "snapshot stored in fallback file");
        Ok(PersistOutcome::Fallback { path })
    }

    /// Latest snapshot of `session_id`, or `None` when neither store has one.
    pub async fn load_snapshot(
        &self,
        session_id: &str,
    ) -> Result<Option<LoadedSnapshot>, ServiceError> {
        ensure_session_id(session_id)?;

        if let Some(backend) = self.backend.resolve().await {
            match backend.get_session(session_id).await {
                Ok(Some(row)) => {
                    if let Some(snapshot) = row.into_snapshot() {
                        return Ok(Some(LoadedSnapshot::from_db(session_id, snapshot)));
                    }
                    debug!(session_id, "durable session row has no snapshot");
                }
                Ok(None) => debug!(session_id, "session not found in durable backend"),
                Err(err) => {
                    warn!(
                        session_id,
                        error = %err,
                        "durable snapshot read failed; trying fallback file"
                    );
                }
            }
        }

        Ok(self.files.read(session_id).await.map(Into::into))
    }

    /// Session ids that have a fallback snapshot file.
    pub async fn list_snapshots(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.files.list().await?)
    }

    /// Remove the fallback snapshot file of `session_id`, returning whether one existed.
    pub async fn delete_snapshot(&self, session_id: &str) -> Result<bool, ServiceError> {
        ensure_session_id(session_id)?;
        let removed = self.files.remove(session_id).await?;
        if removed {
            info!(session_id, "removed fallback snapshot file");
        }
        Ok(removed)
    }
}

fn ensure_session_id(session_id: &str) -> Result<(), ServiceError> {
    if is_valid_session_id(session_id) {
        Ok(())
    } else {
        Err(ServiceError::InvalidSessionId(session_id.to_owned()))
    }
}
