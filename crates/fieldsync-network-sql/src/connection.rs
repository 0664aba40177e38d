//! One engine session on a pooled MySQL/PostgreSQL store.

use crate::dialect::Dialect;
use crate::factory::DriverRuntime;
use fieldsync_core::schema::DATA_COLUMN;
use fieldsync_core::{
    EntityId, StoreCapabilities, StoreConnection, SyncError, SyncResult, TableName, UpsertMode,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, ExecResult, QueryResult,
    Statement, TransactionTrait, Value,
};
use std::sync::Arc;
use tracing::debug;

const TRANSACTION: &str = "<transaction>";

/// A pooled session. While a transaction is open every statement runs on the
/// transaction's pinned connection.
pub struct NetworkConnection {
    runtime: Arc<DriverRuntime>,
    pool: DatabaseConnection,
    tx: Option<DatabaseTransaction>,
    dialect: Dialect,
    upsert_mode: UpsertMode,
}

impl NetworkConnection {
    pub(crate) fn new(
        runtime: Arc<DriverRuntime>,
        pool: DatabaseConnection,
        dialect: Dialect,
        upsert_mode: UpsertMode,
    ) -> Self {
        Self {
            runtime,
            pool,
            tx: None,
            dialect,
            upsert_mode,
        }
    }

    fn statement(&self, sql: String, id: &EntityId, data: Option<&str>) -> Statement {
        let mut values: Vec<Value> = vec![id.to_column().into()];
        if let Some(data) = data {
            values.push(data.to_string().into());
        }
        Statement::from_sql_and_values(self.dialect.backend(), sql, values)
    }

    fn execute(&self, stmt: Statement) -> SyncResult<Result<ExecResult, DbErr>> {
        self.runtime.block_on(async {
            match &self.tx {
                Some(tx) => tx.execute(stmt).await,
                None => self.pool.execute(stmt).await,
            }
        })
    }

    fn query_one(&self, stmt: Statement) -> SyncResult<Result<Option<QueryResult>, DbErr>> {
        self.runtime.block_on(async {
            match &self.tx {
                Some(tx) => tx.query_one(stmt).await,
                None => self.pool.query_one(stmt).await,
            }
        })
    }
}

/// Driver errors that mean the session itself is unusable.
fn is_connection_loss(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

fn map_err(err: DbErr, classify: impl FnOnce(String) -> SyncError) -> SyncError {
    if is_connection_loss(&err) {
        SyncError::Connection(err.to_string())
    } else {
        classify(err.to_string())
    }
}

impl StoreConnection for NetworkConnection {
    fn backend_name(&self) -> &'static str {
        self.dialect.name()
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            transactional_ddl: self.dialect.transactional_ddl(),
            upsert: self.upsert_mode,
        }
    }

    fn begin(&mut self) -> SyncResult<()> {
        let tx = self
            .runtime
            .block_on(self.pool.begin())?
            .map_err(|e| map_err(e, |m| SyncError::query(TRANSACTION, m)))?;
        self.tx = Some(tx);
        Ok(())
    }

    fn commit(&mut self) -> SyncResult<()> {
        match self.tx.take() {
            Some(tx) => self
                .runtime
                .block_on(tx.commit())?
                .map_err(|e| map_err(e, |m| SyncError::query(TRANSACTION, m))),
            None => Ok(()),
        }
    }

    fn rollback(&mut self) -> SyncResult<()> {
        match self.tx.take() {
            Some(tx) => self
                .runtime
                .block_on(tx.rollback())?
                .map_err(|e| map_err(e, |m| SyncError::query(TRANSACTION, m))),
            None => Ok(()),
        }
    }

    fn ensure_table(&mut self, table: &TableName) -> SyncResult<()> {
        let stmt = Statement::from_string(self.dialect.backend(), self.dialect.create_table(table));
        self.execute(stmt)?
            .map_err(|e| map_err(e, |m| SyncError::schema(table.as_str(), m)))?;
        Ok(())
    }

    fn select_for_update(
        &mut self,
        table: &TableName,
        id: &EntityId,
    ) -> SyncResult<Option<String>> {
        let stmt = self.statement(self.dialect.select_for_update(table), id, None);
        let row = self
            .query_one(stmt)?
            .map_err(|e| map_err(e, |m| SyncError::query(table.as_str(), m)))?;
        row.map(|row| row.try_get::<String>("", DATA_COLUMN))
            .transpose()
            .map_err(|e| SyncError::query(table.as_str(), e))
    }

    fn upsert(
        &mut self,
        table: &TableName,
        id: &EntityId,
        data: &str,
        row_exists: bool,
    ) -> SyncResult<()> {
        let sql = self.dialect.upsert(table, self.upsert_mode, row_exists);
        let stmt = self.statement(sql, id, Some(data));
        let result = self
            .execute(stmt)?
            .map_err(|e| map_err(e, |m| SyncError::query(table.as_str(), m)))?;
        debug!(
            table = %table,
            entity = %id,
            rows_affected = result.rows_affected(),
            "Upserted row"
        );
        Ok(())
    }

    fn close(mut self: Box<Self>) -> SyncResult<()> {
        // The pool is shared with the factory and stays up.
        self.rollback()
    }
}
