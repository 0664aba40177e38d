//! Networked SQL backend for the fieldsync engine.
//!
//! Talks to MySQL/MariaDB or PostgreSQL through sea-orm's sqlx drivers. The
//! dialect is picked from the connection URL scheme. Row locks come from
//! `SELECT ... FOR UPDATE`.
//!
//! The engine is blocking, so the factory owns a small tokio runtime and
//! every statement is driven to completion with `block_on`. Engine calls must
//! therefore not run on an async worker thread; use `spawn_blocking`.

mod connection;
mod dialect;
mod factory;

pub use connection::NetworkConnection;
pub use dialect::Dialect;
pub use factory::{redact_url, NetworkConnectionFactory, PoolOptions};
