//! Per-field table naming.
//!
//! Every field identifier doubles as the name of its backing table:
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS <identifier> (
//!   entity_id  <fixed-width id>  PRIMARY KEY NOT NULL,
//!   data       <text>            NOT NULL
//! )
//! ```
//!
//! Identifiers are interpolated into SQL by the backend adapters, so they are
//! validated here once, at registration time, and normalized to lowercase so
//! that backends with case-sensitive table names agree with those without.

use crate::{SyncError, SyncResult};

/// Name of the primary key column in every field table.
pub const ENTITY_ID_COLUMN: &str = "entity_id";

/// Name of the payload column in every field table.
pub const DATA_COLUMN: &str = "data";

/// Width of the `entity_id` column (hyphenated UUID).
pub const ENTITY_ID_WIDTH: usize = 36;

/// Longest accepted identifier. PostgreSQL silently truncates names past 63
/// bytes, so longer identifiers could share a table there.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated, lowercase table name derived from a field identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    /// Validates `identifier` and returns its normalized table name.
    ///
    /// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to [`MAX_IDENTIFIER_LEN`] chars.
    pub fn parse(identifier: &str) -> SyncResult<Self> {
        let mut chars = identifier.chars();
        let first = chars.next().ok_or_else(|| {
            SyncError::Configuration("field identifier must not be empty".to_string())
        })?;

        if identifier.len() > MAX_IDENTIFIER_LEN {
            return Err(SyncError::Configuration(format!(
                "field identifier {identifier:?} is longer than {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        if !(first.is_ascii_alphabetic() || first == '_')
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SyncError::Configuration(format!(
                "field identifier {identifier:?} is not a valid table name"
            )));
        }

        Ok(Self(identifier.to_ascii_lowercase()))
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
