/// Persistence model definitions.
pub mod models;
/// Durable snapshot backends and the local file fallback.
pub mod snapshot_store;
/// Error types shared by durable backends.
pub mod storage;
