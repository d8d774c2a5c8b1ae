use thiserror::Error;

use crate::dao::snapshot_store::file::FileStoreError;

/// Errors surfaced by the snapshot service.
///
/// Durable backend failures never appear here: they degrade to the file fallback.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The session id cannot be used as a snapshot file name.
    #[error("invalid session id `{0}`")]
    InvalidSessionId(String),
    /// The local file fallback failed.
    #[error("snapshot fallback storage failed")]
    Fallback(#[from] FileStoreError),
}
