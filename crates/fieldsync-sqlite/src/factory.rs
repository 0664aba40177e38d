//! Connection factory for a SQLite database file.

use crate::connection::SqliteConnection;
use fieldsync_core::{ConnectionFactory, StoreConnection, SyncError, SyncResult, UpsertMode};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How long a connection waits on another process's write lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Target {
    File(PathBuf),
    /// Named shared-cache database. `_keep_alive` holds it open between
    /// engine connections.
    Memory {
        uri: String,
        _keep_alive: Mutex<Connection>,
    },
}

/// Opens [`SqliteConnection`]s on one database.
pub struct SqliteConnectionFactory {
    target: Target,
    upsert_mode: UpsertMode,
    busy_timeout: Duration,
}

impl SqliteConnectionFactory {
    /// Factory for the database file at `path`, creating parent directories.
    pub fn new(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Connection(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(Self {
            target: Target::File(path.to_path_buf()),
            upsert_mode: UpsertMode::Combined,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// Factory for a private in-memory database, for testing.
    ///
    /// All connections from this factory see the same data, which lives as
    /// long as the factory.
    pub fn in_memory() -> SyncResult<Self> {
        let uri = format!("file:fieldsync-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        let keep_alive = open_uri(&uri)?;
        Ok(Self {
            target: Target::Memory {
                uri,
                _keep_alive: Mutex::new(keep_alive),
            },
            upsert_mode: UpsertMode::Combined,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        })
    }

    pub fn with_upsert_mode(mut self, mode: UpsertMode) -> Self {
        self.upsert_mode = mode;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Database file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::File(path) => Some(path),
            Target::Memory { .. } => None,
        }
    }

    fn open(&self) -> SyncResult<Connection> {
        match &self.target {
            Target::File(path) => {
                let conn = Connection::open(path).map_err(|e| {
                    SyncError::Connection(format!("cannot open {}: {e}", path.display()))
                })?;
                self.apply_busy_timeout(&conn)?;
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA temp_store = MEMORY;
                ",
                )
                .map_err(|e| SyncError::Connection(format!("cannot configure SQLite: {e}")))?;
                Ok(conn)
            }
            // Note: WAL mode doesn't apply to in-memory databases
            Target::Memory { uri, .. } => {
                let conn = open_uri(uri)?;
                self.apply_busy_timeout(&conn)?;
                Ok(conn)
            }
        }
    }

    fn apply_busy_timeout(&self, conn: &Connection) -> SyncResult<()> {
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| SyncError::Connection(format!("cannot set busy timeout: {e}")))
    }
}

fn open_uri(uri: &str) -> SyncResult<Connection> {
    Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| SyncError::Connection(format!("cannot open in-memory SQLite: {e}")))
}

impl ConnectionFactory for SqliteConnectionFactory {
    fn describe(&self) -> String {
        match &self.target {
            Target::File(path) => format!("sqlite:{}", path.display()),
            Target::Memory { uri, .. } => format!("sqlite:{uri}"),
        }
    }

    fn connect(&self) -> SyncResult<Box<dyn StoreConnection>> {
        let conn = self.open()?;
        debug!(
            store = %self.describe(),
            busy_timeout_ms = self.busy_timeout.as_millis() as u64,
            "Opened SQLite connection"
        );
        Ok(Box::new(SqliteConnection::new(conn, self.upsert_mode)))
    }
}

impl std::fmt::Debug for SqliteConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnectionFactory")
            .field("target", &self.describe())
            .field("upsert_mode", &self.upsert_mode)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}
