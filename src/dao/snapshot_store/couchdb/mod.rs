//! CouchDB implementation of [`SnapshotBackend`](crate::dao::snapshot_store::SnapshotBackend).

mod error;
mod models;
mod store;

pub use error::CouchDaoError;
pub use store::CouchSnapshotStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
