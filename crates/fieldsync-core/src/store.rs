//! Backend seam: connection factories and the statements the engine issues.
//!
//! Dialect-specific SQL lives entirely in the adapter crates. The engine only
//! sees the operations below.

use crate::schema::TableName;
use crate::{EntityId, SyncResult};
use serde::{Deserialize, Serialize};

/// How an adapter writes a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertMode {
    /// A single native insert-or-update statement.
    #[default]
    Combined,
    /// `INSERT` when the locking select found nothing, otherwise `REPLACE`
    /// (or `UPDATE` where the dialect has no `REPLACE`).
    CheckThenWrite,
}

/// What a connection's backend can and cannot do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Whether `CREATE TABLE` can run inside a transaction without committing
    /// it. When false the engine provisions tables before `BEGIN`.
    pub transactional_ddl: bool,
    /// Write strategy used by [`StoreConnection::upsert`].
    pub upsert: UpsertMode,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self {
            transactional_ddl: true,
            upsert: UpsertMode::Combined,
        }
    }
}

/// One open session against the shared store.
///
/// Not shared between threads; the engine owns exactly one behind its mutex.
pub trait StoreConnection: Send {
    /// Short dialect name for logs, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    fn capabilities(&self) -> StoreCapabilities;

    /// Starts a transaction whose reads can take row locks.
    fn begin(&mut self) -> SyncResult<()>;

    fn commit(&mut self) -> SyncResult<()>;

    fn rollback(&mut self) -> SyncResult<()>;

    /// `CREATE TABLE IF NOT EXISTS` for one field. Must be idempotent.
    fn ensure_table(&mut self, table: &TableName) -> SyncResult<()>;

    /// Locking select of the entity's `data` column. Inside a transaction the
    /// row (or gap) stays locked until commit or rollback.
    fn select_for_update(&mut self, table: &TableName, id: &EntityId)
        -> SyncResult<Option<String>>;

    /// Writes `data` for `id`. `row_exists` is the result of the preceding
    /// locking select; adapters in [`UpsertMode::CheckThenWrite`] use it to
    /// choose the statement.
    fn upsert(
        &mut self,
        table: &TableName,
        id: &EntityId,
        data: &str,
        row_exists: bool,
    ) -> SyncResult<()>;

    /// Releases the underlying handle.
    fn close(self: Box<Self>) -> SyncResult<()>;
}

/// Produces connections to a configured store.
pub trait ConnectionFactory: Send + Sync {
    /// Human-readable target for logs. Must not include credentials.
    fn describe(&self) -> String;

    fn connect(&self) -> SyncResult<Box<dyn StoreConnection>>;
}
