//! Local file fallback: one pretty-printed JSON document per session.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::models::StoredRecord;

/// File name suffix of every snapshot file.
pub const SNAPSHOT_SUFFIX: &str = ".snapshot.json";

/// Failures of the file fallback.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The snapshot directory could not be created.
    #[error("failed to create snapshot directory `{}`", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The record could not be encoded as JSON.
    #[error("failed to encode snapshot for session `{session_id}`")]
    Encode {
        /// Session being saved.
        session_id: String,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the temporary file failed.
    #[error("failed to write snapshot file `{}`", .path.display())]
    Write {
        /// Temporary file being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Moving the temporary file over the snapshot file failed.
    #[error("failed to replace snapshot file `{}`", .path.display())]
    Replace {
        /// Snapshot file that was not replaced.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The snapshot directory could not be listed.
    #[error("failed to list snapshot directory `{}`", .path.display())]
    List {
        /// Snapshot directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A snapshot file could not be removed.
    #[error("failed to remove snapshot file `{}`", .path.display())]
    Remove {
        /// Snapshot file that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Snapshot files stored under a single directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Store rooted at `dir`; the directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `session_id`.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}{SNAPSHOT_SUFFIX}"))
    }

    /// Replace the session's snapshot file with `record`.
    ///
    /// The document is written to a uniquely named sibling and renamed into place, so a
    /// reader sees either the previous or the new complete file.
    pub async fn write(&self, record: &StoredRecord) -> Result<PathBuf, FileStoreError> {
        self.ensure_dir().await?;

        let payload =
            serde_json::to_vec_pretty(record).map_err(|source| FileStoreError::Encode {
                session_id: record.session_id.clone(),
                source,
            })?;

        let path = self.path_for(&record.session_id);
        let temp_path = self.dir.join(format!(
            ".{}.{}.tmp",
            record.session_id,
            Uuid::new_v4().simple()
        ));

        fs::write(&temp_path, payload)
            .await
            .map_err(|source| FileStoreError::Write {
                path: temp_path.clone(),
                source,
            })?;

        if let Err(source) = fs::rename(&temp_path, &path).await {
            if let Err(err) = fs::remove_file(&temp_path).await {
                debug!(
                    path = %temp_path.display(),
                    error = %err,
                    "failed to clean up temp snapshot"
                );
            }
            return Err(FileStoreError::Replace { path, source });
        }

        Ok(path)
    }

    /// Read the session's snapshot file.
    ///
    /// Missing, unreadable and malformed files all read as `None`.
    pub async fn read(&self, session_id: &str) -> Option<StoredRecord> {
        let path = self.path_for(session_id);
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(session_id, "no fallback snapshot file");
                return None;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read snapshot file");
                return None;
            }
        };

        match serde_json::from_slice::<StoredRecord>(&contents) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring malformed snapshot file");
                None
            }
        }
    }

    /// Session ids of every snapshot file, sorted. A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<String>, FileStoreError> {
        let list_error = |source| FileStoreError::List {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(list_error(err)),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
            let name = entry.file_name();
            let Some(session_id) = name
                .to_str()
                .and_then(|name| name.strip_suffix(SNAPSHOT_SUFFIX))
            else {
                continue;
            };
            if !session_id.is_empty() && !session_id.starts_with('.') {
                sessions.push(session_id.to_owned());
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    /// Delete the session's snapshot file, returning whether one existed.
    pub async fn remove(&self, session_id: &str) -> Result<bool, FileStoreError> {
        let path = self.path_for(session_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FileStoreError::Remove { path, source }),
        }
    }

    async fn ensure_dir(&self) -> Result<(), FileStoreError> {
        let source = match fs::create_dir_all(&self.dir).await {
            Ok(()) => return Ok(()),
            Err(source) => source,
        };
        // Lost a race with a concurrent writer creating the same directory.
        if source.kind() == ErrorKind::AlreadyExists
            && fs::metadata(&self.dir).await.is_ok_and(|meta| meta.is_dir())
        {
            return Ok(());
        }
        Err(FileStoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}
