use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB snapshot store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// No connection string was configured.
    #[error("MongoDB backend selected but no URI is configured (set `MONGO_URI`)")]
    MissingUri,
    /// The connection string is not a MongoDB URI.
    #[error("unsupported MongoDB URI scheme in `{uri}`")]
    UnsupportedScheme {
        /// Offending connection string.
        uri: String,
    },
    /// The configured database name is rejected by MongoDB.
    #[error("invalid MongoDB database name `{name}`: {reason}")]
    InvalidDatabaseName {
        /// Offending database name.
        name: String,
        /// Rule the name breaks.
        reason: &'static str,
    },
    /// The driver could not parse the connection string.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending connection string.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The client could not be built from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Every connection ping failed.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings attempted.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// Upserting the session document failed.
    #[error("failed to save snapshot for session `{session_id}`")]
    SaveSnapshot {
        /// Session being saved.
        session_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the session document failed.
    #[error("failed to load session `{session_id}`")]
    LoadSession {
        /// Session being loaded.
        session_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
