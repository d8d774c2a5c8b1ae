use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    error::{MongoDaoError, MongoResult},
    models::{MongoSessionDocument, doc_id},
};
use crate::{
    config::MongoSettings,
    dao::{
        models::{SessionRow, SnapshotUpdate},
        snapshot_store::SnapshotBackend,
        storage::StorageResult,
    },
};

const SESSION_COLLECTION_NAME: &str = "sessions";
const APP_NAME: &str = "nightfall-engine";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_DATABASE_NAME_LEN: usize = 63;
const FORBIDDEN_DATABASE_CHARS: &[char] = &[
    '/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0',
];

/// Durable backend storing one document per session in MongoDB.
#[derive(Clone)]
pub struct MongoSnapshotStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: Database,
}

impl MongoSnapshotStore {
    /// Validate `settings`, then connect and ping until the server answers or the configured
    /// attempts run out.
    pub async fn connect(settings: &MongoSettings) -> MongoResult<Self> {
        let uri = validate_uri(settings.uri.as_deref())?;
        validate_database_name(&settings.database)?;

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
        options.server_selection_timeout = Some(settings.server_selection_timeout());

        let client = Client::with_options(options)
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&settings.database);
        ping_until_ready(&database, settings).await?;

        info!(database = %settings.database, "connected to MongoDB snapshot store");
        Ok(Self {
            inner: Arc::new(MongoInner { database }),
        })
    }

    fn collection(&self) -> Collection<MongoSessionDocument> {
        self.inner
            .database
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn save_snapshot(&self, update: SnapshotUpdate) -> MongoResult<()> {
        let session_id = update.session_id.clone();
        let document: MongoSessionDocument = update.into();

        self.collection()
            .replace_one(doc_id(&session_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSnapshot { session_id, source })?;

        Ok(())
    }

    async fn find_session(&self, session_id: String) -> MongoResult<Option<SessionRow>> {
        let document = self
            .collection()
            .find_one(doc_id(&session_id))
            .await
            .map_err(|source| MongoDaoError::LoadSession { session_id, source })?;

        Ok(document.map(Into::into))
    }
}

impl SnapshotBackend for MongoSnapshotStore {
    fn update_snapshot(&self, update: SnapshotUpdate) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_snapshot(update).await.map_err(Into::into) })
    }

    fn get_session(
        &self,
        session_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionRow>>> {
        let store = self.clone();
        let session_id = session_id.to_owned();
        Box::pin(async move { store.find_session(session_id).await.map_err(Into::into) })
    }
}

async fn ping_until_ready(database: &Database, settings: &MongoSettings) -> MongoResult<()> {
    let max_attempts = settings.connect_attempts.max(1);
    let mut attempts = 0;
    let mut delay = settings.retry_delay();

    loop {
        attempts += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(()),
            Err(source) if attempts >= max_attempts => {
                return Err(MongoDaoError::InitialPing { attempts, source });
            }
            Err(err) => {
                debug!(attempts, error = %err, "MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

fn validate_uri(uri: Option<&str>) -> MongoResult<&str> {
    let uri = uri.map(str::trim).filter(|uri| !uri.is_empty());
    let uri = uri.ok_or(MongoDaoError::MissingUri)?;
    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        Ok(uri)
    } else {
        Err(MongoDaoError::UnsupportedScheme {
            uri: uri.to_owned(),
        })
    }
}

fn validate_database_name(name: &str) -> MongoResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > MAX_DATABASE_NAME_LEN {
        "name is longer than 63 bytes"
    } else if name.contains(FORBIDDEN_DATABASE_CHARS) {
        "name contains a character MongoDB forbids"
    } else {
        return Ok(());
    };

    Err(MongoDaoError::InvalidDatabaseName {
        name: name.to_owned(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_must_be_present_and_use_a_mongo_scheme() {
        assert!(matches!(validate_uri(None), Err(MongoDaoError::MissingUri)));
        assert!(matches!(validate_uri(Some("  ")), Err(MongoDaoError::MissingUri)));
        assert!(matches!(
            validate_uri(Some("http://localhost:27017")),
            Err(MongoDaoError::UnsupportedScheme { .. })
        ));
        assert_eq!(
            validate_uri(Some(" mongodb://localhost:27017 ")).unwrap(),
            "mongodb://localhost:27017"
        );
        assert!(validate_uri(Some("mongodb+srv://cluster.example.net")).is_ok());
    }

    #[test]
    fn database_names_follow_mongo_rules() {
        assert!(validate_database_name("nightfall").is_ok());
        assert!(validate_database_name("nightfall_sessions-2").is_ok());
        for name in ["", "night.fall", "night fall", "a/b", "$db"] {
            assert!(
                matches!(
                    validate_database_name(name),
                    Err(MongoDaoError::InvalidDatabaseName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_database_name(&"n".repeat(64)).is_err());
    }

    #[tokio::test]
    async fn connect_rejects_missing_uri_without_network() {
        let settings = MongoSettings::default();
        let err = MongoSnapshotStore::connect(&settings).await.err();
        assert!(matches!(err, Some(MongoDaoError::MissingUri)));
    }
}
