//! Engine error types.

use thiserror::Error;

/// A value could not be encoded to, or decoded from, its stored text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {direction} {type_name}: {message}")]
pub struct SerializationError {
    /// Either `"serialize"` or `"deserialize"`.
    pub direction: &'static str,
    /// Rust type name of the value involved.
    pub type_name: &'static str,
    /// Underlying codec message.
    pub message: String,
}

impl SerializationError {
    /// Encoding `type_name` failed.
    pub fn encode(type_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            direction: "serialize",
            type_name,
            message: message.into(),
        }
    }

    /// Decoding into `type_name` failed.
    pub fn decode(type_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            direction: "deserialize",
            type_name,
            message: message.into(),
        }
    }
}

/// Sync engine error type.
///
/// Every variant is fatal to the enclosing `read`/`write` call. A field
/// without a serializer is skipped and a write for an entity that is not live
/// is a no-op; neither is an error.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Backend unreachable or cannot be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Table provisioning failed.
    #[error("Schema error on table {table}: {message}")]
    Schema { table: String, message: String },

    /// A read or write statement failed.
    #[error("Query error on table {table}: {message}")]
    Query { table: String, message: String },

    /// Stored payload cannot be decoded, or a live value cannot be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Invalid or conflicting registration/configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An accessor was asked for an operation it does not implement.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A field accessor failed while touching the live entity.
    #[error("Accessor {identifier} failed: {message}")]
    Accessor { identifier: String, message: String },
}

impl SyncError {
    /// Shorthand for a [`SyncError::Query`] raised while touching `table`.
    pub fn query(table: impl Into<String>, message: impl ToString) -> Self {
        Self::Query {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a [`SyncError::Schema`] raised while provisioning `table`.
    pub fn schema(table: impl Into<String>, message: impl ToString) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
