//! Process configuration.

use crate::{CoreError, CoreResult, Paths};
use fieldsync_core::{FallbackCodec, UpsertMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Wait before reading an arriving entity: two ticks at 20 Hz.
pub const DEFAULT_ARRIVAL_DELAY_MS: u64 = 100;

/// Overrides `log_level`.
pub const LOG_LEVEL_ENV: &str = "FIELDSYNC_LOG_LEVEL";

/// Switches the backend to the networked store at this URL.
pub const DATABASE_URL_ENV: &str = "FIELDSYNC_DATABASE_URL";

/// Which shared store to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Single-file SQLite database. `None` uses [`Paths::database_file`].
    Sqlite {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    /// MySQL/MariaDB or PostgreSQL server.
    Network { url: String },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Sqlite { path: None }
    }
}

/// Connection pool settings for the networked backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

/// Main fieldsync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Field identifiers that are never read or written.
    #[serde(default)]
    pub excluded_fields: Vec<String>,
    /// Delay between an entity arriving and its fields being read.
    #[serde(default = "default_arrival_delay_ms")]
    pub arrival_delay_ms: u64,
    /// Codec used for value types without a registered serializer. `null`
    /// disables synthesis, so such fields are skipped.
    #[serde(default = "default_structured_fallback")]
    pub structured_fallback: Option<FallbackCodec>,
    #[serde(default)]
    pub upsert_mode: UpsertMode,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Also append JSONL logs to [`Paths::log_file`].
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_arrival_delay_ms() -> u64 {
    DEFAULT_ARRIVAL_DELAY_MS
}

fn default_structured_fallback() -> Option<FallbackCodec> {
    Some(FallbackCodec::Json)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: BackendConfig::default(),
            excluded_fields: Vec::new(),
            arrival_delay_ms: DEFAULT_ARRIVAL_DELAY_MS,
            structured_fallback: default_structured_fallback(),
            upsert_mode: UpsertMode::default(),
            pool: PoolConfig::default(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Load configuration from `config.json` under `paths`, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::read(path, e))?;
        serde_json::from_str(&content).map_err(|source| CoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("cannot encode configuration: {e}")))?;
        let path = paths.config_file();
        std::fs::write(&path, content).map_err(|e| CoreError::write(path, e))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.backend = BackendConfig::Network { url };
        }
    }

    /// Rejects settings that would only fail later, at first connect.
    pub fn validate(&self) -> CoreResult<()> {
        if let BackendConfig::Network { url } = &self.backend {
            let parsed = Url::parse(url)?;
            match parsed.scheme() {
                "mysql" | "mariadb" | "postgres" | "postgresql" => {}
                other => {
                    return Err(CoreError::Config(format!(
                        "unsupported database scheme {other:?}"
                    )))
                }
            }
        }
        if let Some(field) = self.excluded_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(CoreError::Config(format!(
                "excluded field identifier {field:?} is blank"
            )));
        }
        Ok(())
    }

    /// SQLite file this configuration points at, if any.
    pub fn sqlite_path(&self, paths: &Paths) -> Option<PathBuf> {
        match &self.backend {
            BackendConfig::Sqlite { path } => {
                Some(path.clone().unwrap_or_else(|| paths.database_file()))
            }
            BackendConfig::Network { .. } => None,
        }
    }

    pub fn arrival_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.arrival_delay_ms)
    }
}
