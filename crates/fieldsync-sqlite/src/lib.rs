//! SQLite backend for the fieldsync engine.
//!
//! Every process opens the same database file. `BEGIN IMMEDIATE` takes the
//! database write lock up front, which is SQLite's equivalent of a locking
//! read, and WAL mode keeps readers in other processes unblocked meanwhile.
//!
//! ```ignore
//! let factory = SqliteConnectionFactory::new("/var/lib/fieldsync/fields.db")?;
//! let engine = SyncEngine::new(fields, registry, Arc::new(factory), players);
//! ```

mod connection;
mod factory;
mod statements;


pub use connection::SqliteConnection;
pub use factory::{SqliteConnectionFactory, DEFAULT_BUSY_TIMEOUT};
