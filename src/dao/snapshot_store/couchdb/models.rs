use serde::{Deserialize, Serialize};

use crate::dao::models::{SessionRow, Snapshot, SnapshotUpdate, epoch_millis};

pub const SESSION_PREFIX: &str = "session::";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub session: SessionBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBody {
    pub session_id: String,
    #[serde(default)]
    pub latest_snapshot: Option<Snapshot>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub checksum: Option<String>,
    pub updated_at_ms: u64,
}

impl From<(SnapshotUpdate, Option<String>)> for CouchSessionDocument {
    fn from((update, rev): (SnapshotUpdate, Option<String>)) -> Self {
        Self {
            id: session_doc_id(&update.session_id),
            rev,
            session: SessionBody {
                session_id: update.session_id,
                latest_snapshot: Some(update.snapshot),
                version: update.version,
                checksum: update.checksum,
                updated_at_ms: epoch_millis(std::time::SystemTime::now()),
            },
        }
    }
}

impl From<CouchSessionDocument> for SessionRow {
    fn from(doc: CouchSessionDocument) -> Self {
        Self {
            session_id: doc.session.session_id,
            latest_snapshot: doc.session.latest_snapshot,
        }
    }
}

pub fn session_doc_id(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_flattens_body_and_omits_missing_rev() {
        let update =
            SnapshotUpdate::from_snapshot("abc", Snapshot::new(json!({"room": 1, "version": 3})));
        let doc = CouchSessionDocument::from((update, None));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["_id"], "session::abc");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["session_id"], "abc");
        assert_eq!(value["version"], 3);
        assert_eq!(value["latest_snapshot"], json!({"room": 1, "version": 3}));
    }

    #[test]
    fn document_converts_back_into_a_row() {
        let raw = json!({
            "_id": "session::abc",
            "_rev": "2-deadbeef",
            "session_id": "abc",
            "latest_snapshot": {"room": 4},
            "updated_at_ms": 1,
        });
        let doc: CouchSessionDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.rev.as_deref(), Some("2-deadbeef"));

        let row = SessionRow::from(doc);
        assert_eq!(row.session_id, "abc");
        assert_eq!(row.into_snapshot(), Some(Snapshot::new(json!({"room": 4}))));
    }
}
