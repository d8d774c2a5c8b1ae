use std::error::Error;
use thiserror::Error;

/// Result alias for durable backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by durable backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable summary of the failure.
        message: String,
        /// Backend specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No durable backend is configured for this process.
    #[error("no durable backend configured (backend = {backend})")]
    NotConfigured {
        /// Configured backend name.
        backend: &'static str,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
