//! A single SQLite session implementing [`StoreConnection`].

use crate::statements;
use fieldsync_core::{
    EntityId, StoreCapabilities, StoreConnection, SyncError, SyncResult, TableName, UpsertMode,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// Pseudo table name reported for transaction-control failures.
const TRANSACTION: &str = "<transaction>";

/// One open handle on the fields database.
pub struct SqliteConnection {
    conn: Connection,
    upsert_mode: UpsertMode,
}

impl SqliteConnection {
    pub(crate) fn new(conn: Connection, upsert_mode: UpsertMode) -> Self {
        Self { conn, upsert_mode }
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StoreConnection for SqliteConnection {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            transactional_ddl: true,
            upsert: self.upsert_mode,
        }
    }

    fn begin(&mut self) -> SyncResult<()> {
        // Write lock is held from here until COMMIT/ROLLBACK.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| SyncError::query(TRANSACTION, e))
    }

    fn commit(&mut self) -> SyncResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| SyncError::query(TRANSACTION, e))
    }

    fn rollback(&mut self) -> SyncResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| SyncError::query(TRANSACTION, e))
    }

    fn ensure_table(&mut self, table: &TableName) -> SyncResult<()> {
        self.conn
            .execute_batch(&statements::create_table(table))
            .map_err(|e| SyncError::schema(table.as_str(), e))
    }

    fn select_for_update(
        &mut self,
        table: &TableName,
        id: &EntityId,
    ) -> SyncResult<Option<String>> {
        let sql = statements::select_data(table);
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| SyncError::query(table.as_str(), e))?;
        stmt.query_row(params![id.to_column()], |row| row.get::<_, String>(0))
            .optional()
            .map_err(|e| SyncError::query(table.as_str(), e))
    }

    fn upsert(
        &mut self,
        table: &TableName,
        id: &EntityId,
        data: &str,
        row_exists: bool,
    ) -> SyncResult<()> {
        let sql = statements::upsert(table, self.upsert_mode, row_exists);
        let changed = self
            .conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute(params![id.to_column(), data]))
            .map_err(|e| SyncError::query(table.as_str(), e))?;
        debug!(table = %table, entity = %id, changed, "Upserted row");
        Ok(())
    }

    fn close(self: Box<Self>) -> SyncResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| SyncError::Connection(format!("failed to close SQLite: {e}")))
    }
}
