use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest session identifier accepted as a file stem.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque session state owned by the orchestrator.
///
/// The persistence layer never inspects the document beyond the optional top-level
/// `version` and `checksum` fields, which are forwarded to durable backends as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Value);

impl Snapshot {
    /// Wrap an arbitrary JSON document.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the underlying JSON document.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Monotonic version carried by the snapshot, if any.
    pub fn version(&self) -> Option<u64> {
        self.0.get("version").and_then(Value::as_u64)
    }

    /// Checksum carried by the snapshot, if any.
    pub fn checksum(&self) -> Option<&str> {
        self.0.get("checksum").and_then(Value::as_str)
    }

    fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Payload handed to a durable backend on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUpdate {
    /// Session the snapshot belongs to.
    pub session_id: String,
    /// Latest session state.
    pub snapshot: Snapshot,
    /// Bookkeeping version copied from the snapshot.
    pub version: Option<u64>,
    /// Bookkeeping checksum copied from the snapshot.
    pub checksum: Option<String>,
}

impl SnapshotUpdate {
    /// Build an update, lifting `version` and `checksum` out of the snapshot document.
    pub fn from_snapshot(session_id: impl Into<String>, snapshot: Snapshot) -> Self {
        let version = snapshot.version();
        let checksum = snapshot.checksum().map(str::to_owned);
        Self {
            session_id: session_id.into(),
            snapshot,
            version,
            checksum,
        }
    }
}

/// Session row as returned by a durable backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    /// Session identifier.
    pub session_id: String,
    /// Latest stored snapshot, absent when the row exists without state.
    #[serde(default)]
    pub latest_snapshot: Option<Snapshot>,
}

impl SessionRow {
    /// Take the stored snapshot when the row actually carries one.
    pub fn into_snapshot(self) -> Option<Snapshot> {
        self.latest_snapshot.filter(|snapshot| !snapshot.is_null())
    }
}

/// Document written to the local fallback storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Epoch milliseconds at which the record was written, absent in hand-written files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<u64>,
    /// Session identifier.
    pub session_id: String,
    /// Latest session state.
    pub snapshot: Snapshot,
}

impl StoredRecord {
    /// Stamp a snapshot with the current wall-clock time.
    pub fn new(session_id: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            saved_at: Some(epoch_millis(SystemTime::now())),
            session_id: session_id.into(),
            snapshot,
        }
    }
}

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Durable backend.
    Db,
    /// Local fallback file.
    File,
}

/// Snapshot returned to the orchestrator on session resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// Restored session state.
    pub snapshot: Snapshot,
    /// Save time, only known for file records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<u64>,
    /// Store that produced the snapshot.
    pub loaded_from: SnapshotSource,
}

impl LoadedSnapshot {
    /// Wrap a snapshot read from the durable backend.
    pub fn from_db(session_id: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            session_id: session_id.into(),
            snapshot,
            saved_at: None,
            loaded_from: SnapshotSource::Db,
        }
    }
}

impl From<StoredRecord> for LoadedSnapshot {
    fn from(record: StoredRecord) -> Self {
        Self {
            session_id: record.session_id,
            snapshot: record.snapshot,
            saved_at: record.saved_at,
            loaded_from: SnapshotSource::File,
        }
    }
}

/// Whether `id` can safely be used as a fallback file stem.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Milliseconds since the Unix epoch, saturating to zero for pre-epoch clocks.
pub fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_lifts_bookkeeping_fields() {
        let snapshot = Snapshot::new(json!({"room": 2, "version": 7, "checksum": "ab12"}));
        let update = SnapshotUpdate::from_snapshot("abc", snapshot.clone());
        assert_eq!(update.version, Some(7));
        assert_eq!(update.checksum.as_deref(), Some("ab12"));
        assert_eq!(update.snapshot, snapshot);
    }

    #[test]
    fn update_without_bookkeeping_fields() {
        let update = SnapshotUpdate::from_snapshot("abc", Snapshot::new(json!([1, 2, 3])));
        assert_eq!(update.version, None);
        assert_eq!(update.checksum, None);
    }

    #[test]
    fn stored_record_uses_camel_case_keys() {
        let record = StoredRecord {
            saved_at: Some(42),
            session_id: "abc".into(),
            snapshot: Snapshot::new(json!({"room": 1, "done": false})),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"savedAt": 42, "sessionId": "abc", "snapshot": {"room": 1, "done": false}})
        );
    }

    #[test]
    fn stored_record_without_timestamp_still_loads() {
        let record: StoredRecord =
            serde_json::from_value(json!({"sessionId": "abc", "snapshot": {"room": 2}})).unwrap();
        assert_eq!(record.saved_at, None);

        let loaded = LoadedSnapshot::from(record);
        assert_eq!(loaded.loaded_from, SnapshotSource::File);
        assert_eq!(loaded.saved_at, None);
        assert_eq!(loaded.snapshot, Snapshot::new(json!({"room": 2})));
    }

    #[test]
    fn row_with_null_snapshot_is_empty() {
        let row: SessionRow =
            serde_json::from_value(json!({"session_id": "abc", "latest_snapshot": null}))
                .unwrap();
        assert!(row.into_snapshot().is_none());

        let row: SessionRow = serde_json::from_value(json!({"session_id": "abc"})).unwrap();
        assert!(row.into_snapshot().is_none());
    }

    #[test]
    fn session_id_validation() {
        assert!(is_valid_session_id("abc"));
        assert!(is_valid_session_id("team-7_run.2"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id(".hidden"));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id("a/b"));
        assert!(!is_valid_session_id(&"x".repeat(MAX_SESSION_ID_LEN + 1)));
    }
}
