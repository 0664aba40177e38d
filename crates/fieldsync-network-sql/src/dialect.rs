//! Per-dialect statement text.

use fieldsync_core::schema::{DATA_COLUMN, ENTITY_ID_COLUMN, ENTITY_ID_WIDTH};
use fieldsync_core::{SyncError, SyncResult, TableName, UpsertMode};
use sea_orm::DatabaseBackend;
use url::Url;

/// SQL dialect of a networked store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Picks the dialect from a connection URL's scheme.
    pub fn from_url(url: &Url) -> SyncResult<Self> {
        match url.scheme() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(SyncError::Configuration(format!(
                "unsupported database scheme {other:?}, expected mysql or postgres"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    pub fn backend(self) -> DatabaseBackend {
        match self {
            Self::MySql => DatabaseBackend::MySql,
            Self::Postgres => DatabaseBackend::Postgres,
        }
    }

    /// MySQL commits the open transaction on any DDL statement.
    pub fn transactional_ddl(self) -> bool {
        matches!(self, Self::Postgres)
    }

    fn quote(self, table: &TableName) -> String {
        match self {
            Self::MySql => format!("`{}`", table.as_str()),
            Self::Postgres => format!("\"{}\"", table.as_str()),
        }
    }

    /// Placeholders for the `(entity_id, data)` parameters, in that order.
    fn params(self) -> (&'static str, &'static str) {
        match self {
            Self::MySql => ("?", "?"),
            Self::Postgres => ("$1", "$2"),
        }
    }

    pub(crate) fn create_table(self, table: &TableName) -> String {
        let data_type = match self {
            Self::MySql => "MEDIUMTEXT",
            Self::Postgres => "TEXT",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             {ENTITY_ID_COLUMN} CHAR({ENTITY_ID_WIDTH}) PRIMARY KEY NOT NULL, \
             {DATA_COLUMN} {data_type} NOT NULL)",
            self.quote(table)
        )
    }

    pub(crate) fn select_for_update(self, table: &TableName) -> String {
        let (id, _) = self.params();
        format!(
            "SELECT {DATA_COLUMN} FROM {} WHERE {ENTITY_ID_COLUMN} = {id} FOR UPDATE",
            self.quote(table)
        )
    }

    /// Write statement. Parameters are always bound as `(entity_id, data)`.
    pub(crate) fn upsert(self, table: &TableName, mode: UpsertMode, row_exists: bool) -> String {
        let quoted = self.quote(table);
        let (id, data) = self.params();
        let insert =
            format!("INSERT INTO {quoted} ({ENTITY_ID_COLUMN}, {DATA_COLUMN}) VALUES ({id}, {data})");
        match (self, mode, row_exists) {
            (Self::MySql, UpsertMode::Combined, _) => format!(
                "{insert} ON DUPLICATE KEY UPDATE {DATA_COLUMN} = VALUES({DATA_COLUMN})"
            ),
            (Self::Postgres, UpsertMode::Combined, _) => format!(
                "{insert} ON CONFLICT ({ENTITY_ID_COLUMN}) DO UPDATE SET {DATA_COLUMN} = EXCLUDED.{DATA_COLUMN}"
            ),
            (_, UpsertMode::CheckThenWrite, false) => insert,
            (Self::MySql, UpsertMode::CheckThenWrite, true) => format!(
                "REPLACE INTO {quoted} ({ENTITY_ID_COLUMN}, {DATA_COLUMN}) VALUES ({id}, {data})"
            ),
            (Self::Postgres, UpsertMode::CheckThenWrite, true) => format!(
                "UPDATE {quoted} SET {DATA_COLUMN} = {data} WHERE {ENTITY_ID_COLUMN} = {id}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::parse("Inventory").unwrap()
    }

    #[test]
    fn scheme_selects_dialect() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert_eq!(
            Dialect::from_url(&url("mysql://u:p@db/fields")).unwrap(),
            Dialect::MySql
        );
        assert_eq!(
            Dialect::from_url(&url("postgresql://db/fields")).unwrap(),
            Dialect::Postgres
        );
        assert!(matches!(
            Dialect::from_url(&url("redis://db")),
            Err(SyncError::Configuration(_))
        ));
    }

    #[test]
    fn mysql_ddl_is_not_transactional() {
        assert!(!Dialect::MySql.transactional_ddl());
        assert!(Dialect::Postgres.transactional_ddl());
    }

    #[test]
    fn mysql_statements() {
        let d = Dialect::MySql;
        assert_eq!(
            d.create_table(&table()),
            "CREATE TABLE IF NOT EXISTS `inventory` (entity_id CHAR(36) PRIMARY KEY NOT NULL, \
             data MEDIUMTEXT NOT NULL)"
        );
        assert_eq!(
            d.select_for_update(&table()),
            "SELECT data FROM `inventory` WHERE entity_id = ? FOR UPDATE"
        );
        assert_eq!(
            d.upsert(&table(), UpsertMode::Combined, true),
            "INSERT INTO `inventory` (entity_id, data) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE data = VALUES(data)"
        );
        assert_eq!(
            d.upsert(&table(), UpsertMode::CheckThenWrite, true),
            "REPLACE INTO `inventory` (entity_id, data) VALUES (?, ?)"
        );
    }

    #[test]
    fn postgres_statements() {
        let d = Dialect::Postgres;
        assert_eq!(
            d.create_table(&table()),
            "CREATE TABLE IF NOT EXISTS \"inventory\" (entity_id CHAR(36) PRIMARY KEY NOT NULL, \
             data TEXT NOT NULL)"
        );
        assert_eq!(
            d.select_for_update(&table()),
            "SELECT data FROM \"inventory\" WHERE entity_id = $1 FOR UPDATE"
        );
        assert_eq!(
            d.upsert(&table(), UpsertMode::Combined, false),
            "INSERT INTO \"inventory\" (entity_id, data) VALUES ($1, $2) \
             ON CONFLICT (entity_id) DO UPDATE SET data = EXCLUDED.data"
        );
        assert_eq!(
            d.upsert(&table(), UpsertMode::CheckThenWrite, false),
            "INSERT INTO \"inventory\" (entity_id, data) VALUES ($1, $2)"
        );
        assert_eq!(
            d.upsert(&table(), UpsertMode::CheckThenWrite, true),
            "UPDATE \"inventory\" SET data = $2 WHERE entity_id = $1"
        );
    }
}
