use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{SessionRow, Snapshot, SnapshotUpdate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    latest_snapshot: Option<Snapshot>,
    // BSON has no unsigned 64-bit integer.
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    checksum: Option<String>,
    updated_at: DateTime,
}

impl From<SnapshotUpdate> for MongoSessionDocument {
    fn from(value: SnapshotUpdate) -> Self {
        Self {
            id: value.session_id,
            latest_snapshot: Some(value.snapshot),
            version: value.version.and_then(|version| i64::try_from(version).ok()),
            checksum: value.checksum,
            updated_at: DateTime::now(),
        }
    }
}

impl From<MongoSessionDocument> for SessionRow {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            session_id: value.id,
            latest_snapshot: value.latest_snapshot,
        }
    }
}

pub fn doc_id(session_id: &str) -> Document {
    doc! {"_id": session_id}
}
