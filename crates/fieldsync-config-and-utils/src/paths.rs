//! File system locations.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Default directory name under the home directory.
const BASE_DIR_NAME: &str = ".fieldsync";
/// Default SQLite database file name.
const DATABASE_FILE_NAME: &str = "fields.sqlite";
/// JSONL log file name inside the logs directory.
const LOG_FILE_NAME: &str = "fieldsync.jsonl";

/// Resolves the files fieldsync reads and writes.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Uses `~/.fieldsync`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::NoHomeDir)?;
        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the config file path (~/.fieldsync/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default SQLite database path (~/.fieldsync/fields.sqlite).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join(DATABASE_FILE_NAME)
    }

    /// Get the logs directory (~/.fieldsync/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.fieldsync/logs/fieldsync.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        for dir in [self.base_dir.clone(), self.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| CoreError::write(dir, e))?;
        }
        Ok(())
    }
}
