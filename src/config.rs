//! Engine configuration loading: fallback data directory, durable backend selection and the
//! connection settings of each durable backend.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/nightfall.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NIGHTFALL_CONFIG_PATH";
/// Environment variable that overrides the configured fallback directory.
const DATA_DIR_ENV: &str = "NIGHTFALL_DATA_DIR";
/// Environment variable that overrides the configured backend.
const BACKEND_ENV: &str = "NIGHTFALL_BACKEND";
/// Directory holding `<sessionId>.snapshot.json` fallback files.
pub const DEFAULT_DATA_DIR: &str = "data/sessions";
/// Database used by the Mongo backend when none is configured.
pub const DEFAULT_MONGO_DATABASE: &str = "nightfall";
/// Database used by the Couch backend when none is configured.
pub const DEFAULT_COUCH_DATABASE: &str = "nightfall_sessions";

const MONGO_URI_ENV: &str = "MONGO_URI";
const MONGO_DB_ENV: &str = "MONGO_DB";
const COUCH_BASE_URL_ENV: &str = "COUCH_BASE_URL";
const COUCH_DB_ENV: &str = "COUCH_DB";
const COUCH_USERNAME_ENV: &str = "COUCH_USERNAME";
const COUCH_PASSWORD_ENV: &str = "COUCH_PASSWORD";

/// Durable backend consulted before the file fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// File fallback only.
    #[default]
    None,
    /// In-process map, lost on restart.
    Memory,
    /// MongoDB, configured through [`MongoSettings`].
    Mongo,
    /// CouchDB, configured through [`CouchSettings`].
    Couch,
}

impl BackendKind {
    /// Lower-case name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::Memory => "memory",
            BackendKind::Mongo => "mongo",
            BackendKind::Couch => "couch",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(BackendKind::None),
            "memory" => Some(BackendKind::Memory),
            "mongo" | "mongodb" => Some(BackendKind::Mongo),
            "couch" | "couchdb" => Some(BackendKind::Couch),
            _ => None,
        }
    }
}

/// Connection settings of the MongoDB backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    /// `mongodb://` or `mongodb+srv://` connection string; the backend is unavailable without it.
    pub uri: Option<String>,
    /// Database holding the `sessions` collection.
    pub database: String,
    /// Pings attempted before the backend is declared unavailable.
    pub connect_attempts: u32,
    /// Delay before the second ping, doubled after each failure.
    pub retry_delay_ms: u64,
    /// Server selection timeout applied to every operation.
    pub server_selection_timeout_ms: u64,
}

impl MongoSettings {
    /// Delay before the second connection attempt.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Upper bound on how long a single operation waits for a reachable server.
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: None,
            database: DEFAULT_MONGO_DATABASE.to_owned(),
            connect_attempts: 3,
            retry_delay_ms: 250,
            server_selection_timeout_ms: 2_000,
        }
    }
}

/// Connection settings of the CouchDB backend.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CouchSettings {
    /// Server root such as `http://localhost:5984`; the backend is unavailable without it.
    pub base_url: Option<String>,
    /// Database holding the session documents, created on first connect.
    pub database: String,
    /// Basic-auth user, only sent together with [`CouchSettings::password`].
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
}

impl Default for CouchSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            database: DEFAULT_COUCH_DATABASE.to_owned(),
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for CouchSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchSettings")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Immutable runtime configuration of the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory for fallback snapshot files.
    pub data_dir: PathBuf,
    /// Durable backend to probe on first use.
    pub backend: BackendKind,
    /// Used when `backend` is [`BackendKind::Mongo`].
    pub mongo: MongoSettings,
    /// Used when `backend` is [`BackendKind::Couch`].
    pub couch: CouchSettings,
}

impl EngineConfig {
    /// Load the configuration from disk and the environment, falling back to defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        data_dir = %config.data_dir.display(),
                        backend = config.backend.as_str(),
                        "loaded engine config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(value) = env::var(BACKEND_ENV) {
            match BackendKind::parse(&value) {
                Some(kind) => self.backend = kind,
                None => warn!(
                    value = %value,
                    "unknown {BACKEND_ENV} value; keeping configured backend"
                ),
            }
        }

        if let Some(uri) = env_value(MONGO_URI_ENV) {
            self.mongo.uri = Some(uri);
        }
        if let Some(database) = env_value(MONGO_DB_ENV) {
            self.mongo.database = database;
        }
        if let Some(base_url) = env_value(COUCH_BASE_URL_ENV) {
            self.couch.base_url = Some(base_url);
        }
        if let Some(database) = env_value(COUCH_DB_ENV) {
            self.couch.database = database;
        }
        if let Some(username) = env_value(COUCH_USERNAME_ENV) {
            self.couch.username = Some(username);
        }
        if let Some(password) = env_value(COUCH_PASSWORD_ENV) {
            self.couch.password = Some(password);
        }

        self
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    backend: BackendKind,
    #[serde(default)]
    mongo: MongoSettings,
    #[serde(default)]
    couch: CouchSettings,
}

impl From<RawConfig> for EngineConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            data_dir: value
                .data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            backend: value.backend,
            mongo: value.mongo,
            couch: value.couch,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            backend: BackendKind::default(),
            mongo: MongoSettings::default(),
            couch: CouchSettings::default(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_defaults_missing_fields() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(EngineConfig::from(raw), EngineConfig::default());
    }

    #[test]
    fn raw_config_reads_backend_and_dir() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"data_dir": "/var/lib/nightfall", "backend": "couch"}"#)
                .unwrap();
        let config = EngineConfig::from(raw);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/nightfall"));
        assert_eq!(config.backend, BackendKind::Couch);
    }

    #[test]
    fn backend_settings_fill_in_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "backend": "mongo",
                "mongo": {"uri": "mongodb://db:27017", "connect_attempts": 5},
                "couch": {"base_url": "http://couch:5984", "username": "admin"}
            }"#,
        )
        .unwrap();
        let config = EngineConfig::from(raw);

        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.mongo.uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(config.mongo.database, DEFAULT_MONGO_DATABASE);
        assert_eq!(config.mongo.connect_attempts, 5);
        assert_eq!(config.mongo.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.couch.base_url.as_deref(), Some("http://couch:5984"));
        assert_eq!(config.couch.database, DEFAULT_COUCH_DATABASE);
        assert_eq!(config.couch.password, None);
    }

    #[test]
    fn couch_password_is_redacted_in_debug_output() {
        let settings = CouchSettings {
            password: Some("hunter2".to_owned()),
            ..CouchSettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn backend_names_parse_leniently() {
        assert_eq!(BackendKind::parse("MongoDB"), Some(BackendKind::Mongo));
        assert_eq!(BackendKind::parse(" couch "), Some(BackendKind::Couch));
        assert_eq!(BackendKind::parse(""), Some(BackendKind::None));
        assert_eq!(BackendKind::parse("redis"), None);
    }
}
