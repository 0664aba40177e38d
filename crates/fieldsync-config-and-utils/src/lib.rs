//! Configuration, paths and logging for fieldsync processes.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    BackendConfig, Config, PoolConfig, DEFAULT_ARRIVAL_DELAY_MS, DEFAULT_LOG_LEVEL,
    DATABASE_URL_ENV, LOG_LEVEL_ENV,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, JsonlWriter};
pub use paths::Paths;
