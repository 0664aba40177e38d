//! Pooled connection factory for networked SQL stores.

use crate::connection::NetworkConnection;
use crate::dialect::Dialect;
use fieldsync_core::{ConnectionFactory, StoreConnection, SyncError, SyncResult, UpsertMode};
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::info;
use url::Url;

/// Pool sizing and driver timeouts. Unset values keep the driver defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout: Option<Duration>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
}

/// Tokio runtime that drives the async driver for blocking callers.
///
/// Shut down in the background on drop, so the last handle may be released
/// from inside an async task.
pub(crate) struct DriverRuntime(Option<Runtime>);

impl DriverRuntime {
    fn start() -> SyncResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("fieldsync-sql")
            .enable_all()
            .build()
            .map_err(|e| SyncError::Connection(format!("cannot start driver runtime: {e}")))?;
        Ok(Self(Some(runtime)))
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> SyncResult<F::Output> {
        match &self.0 {
            Some(runtime) => Ok(runtime.block_on(future)),
            None => Err(SyncError::Connection("driver runtime stopped".to_string())),
        }
    }
}

impl Drop for DriverRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Opens [`NetworkConnection`]s that share one lazily created pool.
pub struct NetworkConnectionFactory {
    url: String,
    redacted: String,
    dialect: Dialect,
    options: PoolOptions,
    upsert_mode: UpsertMode,
    runtime: Arc<DriverRuntime>,
    pool: Mutex<Option<DatabaseConnection>>,
}

impl NetworkConnectionFactory {
    /// Validates `url` and prepares the driver runtime. No connection is made
    /// until the engine first opens.
    pub fn new(url: &str, options: PoolOptions) -> SyncResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| SyncError::Configuration(format!("invalid database URL: {e}")))?;
        let dialect = Dialect::from_url(&parsed)?;
        let runtime = DriverRuntime::start()?;

        Ok(Self {
            url: url.to_string(),
            redacted: redact_url(&parsed),
            dialect,
            options,
            upsert_mode: UpsertMode::Combined,
            runtime: Arc::new(runtime),
            pool: Mutex::new(None),
        })
    }

    pub fn with_upsert_mode(mut self, mode: UpsertMode) -> Self {
        self.upsert_mode = mode;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn pool(&self) -> SyncResult<DatabaseConnection> {
        let mut guard = self.pool.lock();
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let mut options = ConnectOptions::new(self.url.clone());
        options.sqlx_logging(false);
        if let Some(max) = self.options.max_connections {
            options.max_connections(max);
        }
        if let Some(min) = self.options.min_connections {
            options.min_connections(min);
        }
        if let Some(timeout) = self.options.connect_timeout {
            options.connect_timeout(timeout);
        }
        if let Some(timeout) = self.options.acquire_timeout {
            options.acquire_timeout(timeout);
        }
        if let Some(timeout) = self.options.idle_timeout {
            options.idle_timeout(timeout);
        }

        let pool = self
            .runtime
            .block_on(Database::connect(options))?
            .map_err(|e| {
                SyncError::Connection(format!("cannot connect to {}: {e}", self.redacted))
            })?;
        info!(dialect = self.dialect.name(), store = %self.redacted, "Database pool ready");
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

impl ConnectionFactory for NetworkConnectionFactory {
    fn describe(&self) -> String {
        self.redacted.clone()
    }

    fn connect(&self) -> SyncResult<Box<dyn StoreConnection>> {
        let pool = self.pool()?;
        Ok(Box::new(NetworkConnection::new(
            Arc::clone(&self.runtime),
            pool,
            self.dialect,
            self.upsert_mode,
        )))
    }
}

impl std::fmt::Debug for NetworkConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConnectionFactory")
            .field("url", &self.redacted)
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .field("upsert_mode", &self.upsert_mode)
            .finish()
    }
}

/// Renders `url` with its password masked, for logs.
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if redacted.password().is_some() {
        // Only fails for URLs that cannot carry credentials at all.
        let _ = redacted.set_password(Some("****"));
    }
    redacted.to_string()
}
