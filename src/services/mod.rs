/// Once-resolved handle to the optional durable backend.
pub mod backend_probe;
/// Snapshot persistence with durable backend and file fallback.
pub mod snapshot_service;
