//! SQLite statement text.

use fieldsync_core::schema::{DATA_COLUMN, ENTITY_ID_COLUMN};
use fieldsync_core::{TableName, UpsertMode};

/// Double-quotes a validated table name.
fn quoted(table: &TableName) -> String {
    format!("\"{}\"", table.as_str())
}

pub(crate) fn create_table(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         {ENTITY_ID_COLUMN} TEXT PRIMARY KEY NOT NULL, \
         {DATA_COLUMN} TEXT NOT NULL\
         ) WITHOUT ROWID",
        quoted(table)
    )
}

/// Row lookup. The lock itself comes from `BEGIN IMMEDIATE`.
pub(crate) fn select_data(table: &TableName) -> String {
    format!(
        "SELECT {DATA_COLUMN} FROM {} WHERE {ENTITY_ID_COLUMN} = ?1",
        quoted(table)
    )
}

pub(crate) fn upsert(table: &TableName, mode: UpsertMode, row_exists: bool) -> String {
    let table = quoted(table);
    match (mode, row_exists) {
        (UpsertMode::Combined, _) => format!(
            "INSERT INTO {table} ({ENTITY_ID_COLUMN}, {DATA_COLUMN}) VALUES (?1, ?2) \
             ON CONFLICT({ENTITY_ID_COLUMN}) DO UPDATE SET {DATA_COLUMN} = excluded.{DATA_COLUMN}"
        ),
        (UpsertMode::CheckThenWrite, false) => format!(
            "INSERT INTO {table} ({ENTITY_ID_COLUMN}, {DATA_COLUMN}) VALUES (?1, ?2)"
        ),
        (UpsertMode::CheckThenWrite, true) => format!(
            "REPLACE INTO {table} ({ENTITY_ID_COLUMN}, {DATA_COLUMN}) VALUES (?1, ?2)"
        ),
    }
}
