use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{
    config::CouchSettings,
    dao::{
        models::{SessionRow, SnapshotUpdate},
        snapshot_store::SnapshotBackend,
        storage::StorageResult,
    },
};

use super::{
    error::{CouchDaoError, CouchResult},
    models::{CouchSessionDocument, session_doc_id},
};

const MAX_DATABASE_NAME_LEN: usize = 238;

/// Durable backend storing one document per session in CouchDB.
#[derive(Clone)]
pub struct CouchSnapshotStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchSnapshotStore {
    /// Validate `settings`, then connect to CouchDB and create the database if it is missing.
    pub async fn connect(settings: &CouchSettings) -> CouchResult<Self> {
        let base_url = validate_base_url(settings.base_url.as_deref())?;
        validate_database_name(&settings.database)?;

        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(settings.database.as_str());
        let auth = settings
            .username
            .as_deref()
            .zip(settings.password.as_deref())
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        info!(database = %store.database, "connected to CouchDB snapshot store");
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                match create.status() {
                    status if status.is_success() => Ok(()),
                    // Created concurrently by another process.
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(CouchDaoError::DatabaseStatus { database, status }),
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn save_snapshot(&self, update: SnapshotUpdate) -> CouchResult<()> {
        let doc_id = session_doc_id(&update.session_id);
        let rev = self
            .get_document::<CouchSessionDocument>(&doc_id)
            .await?
            .and_then(|existing| existing.rev);
        let doc = CouchSessionDocument::from((update, rev));
        self.put_document(&doc_id, &doc).await
    }
}

impl SnapshotBackend for CouchSnapshotStore {
    fn update_snapshot(&self, update: SnapshotUpdate) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_snapshot(update).await.map_err(Into::into) })
    }

    fn get_session(
        &self,
        session_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionRow>>> {
        let store = self.clone();
        let doc_id = session_doc_id(session_id);
        Box::pin(async move {
            let maybe_doc = store
                .get_document::<CouchSessionDocument>(&doc_id)
                .await?;
            Ok(maybe_doc.map(Into::into))
        })
    }
}

fn validate_base_url(url: Option<&str>) -> CouchResult<&str> {
    let url = url.map(str::trim).filter(|url| !url.is_empty());
    let url = url.ok_or(CouchDaoError::MissingBaseUrl)?;
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(CouchDaoError::UnsupportedBaseUrl {
            url: url.to_owned(),
        })
    }
}

fn validate_database_name(name: &str) -> CouchResult<()> {
    let mut chars = name.chars();
    let reason = match chars.next() {
        None => "name is empty",
        Some(first) if !first.is_ascii_lowercase() => "name must start with a lowercase letter",
        Some(_) if name.len() > MAX_DATABASE_NAME_LEN => "name is longer than 238 characters",
        Some(_) if chars.all(is_database_name_char) => return Ok(()),
        Some(_) => "name may only contain a-z, 0-9 and _$()+-/",
    };

    Err(CouchDaoError::InvalidDatabaseName {
        name: name.to_owned(),
        reason,
    })
}

fn is_database_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_must_be_http() {
        assert!(matches!(validate_base_url(None), Err(CouchDaoError::MissingBaseUrl)));
        assert!(matches!(
            validate_base_url(Some("couch:5984")),
            Err(CouchDaoError::UnsupportedBaseUrl { .. })
        ));
        assert_eq!(
            validate_base_url(Some(" https://couch.example.net/ ")).unwrap(),
            "https://couch.example.net/"
        );
    }

    #[test]
    fn database_names_follow_couch_rules() {
        assert!(validate_database_name("nightfall_sessions").is_ok());
        assert!(validate_database_name("nightfall/sessions-2").is_ok());
        for name in ["", "Nightfall", "_users", "9lives", "night fall"] {
            assert!(
                matches!(
                    validate_database_name(name),
                    Err(CouchDaoError::InvalidDatabaseName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_database_name(&"n".repeat(239)).is_err());
    }

    #[tokio::test]
    async fn connect_rejects_missing_base_url_without_network() {
        let err = CouchSnapshotStore::connect(&CouchSettings::default()).await.err();
        assert!(matches!(err, Some(CouchDaoError::MissingBaseUrl)));
    }
}
