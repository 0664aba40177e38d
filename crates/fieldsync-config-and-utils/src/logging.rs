//! Logging initialization.
//!
//! Installs a `tracing` subscriber with:
//! - Compact human-readable output on stderr
//! - Optionally, structured JSONL appended to a file shared by every
//!   process on the host
//! - Level from `RUST_LOG`, or the configured default

use crate::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Append-only log file writer, flushed after every line so concurrent
/// processes interleave whole lines.
#[derive(Clone)]
pub struct JsonlWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl JsonlWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for JsonlWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for JsonlWriter {
    type Writer = JsonlWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the global subscriber.
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
/// * `log_file` - JSONL file to append to, if any
///
/// # Example
///
/// ```ignore
/// init_logging("info", Some(&paths.log_file()))?;
/// tracing::info!("fieldsync started");
/// ```
pub fn init_logging(level: &str, log_file: Option<&Path>) -> CoreResult<()> {
    let file_layer = match log_file {
        Some(path) => {
            let writer = JsonlWriter::open(path).map_err(|e| {
                CoreError::Logging(format!("cannot open log file {}: {e}", path.display()))
            })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(writer)
                    .with_filter(env_filter(level)),
            )
        }
        None => None,
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_writer(io::stderr)
        .with_filter(env_filter(level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    if let Some(path) = log_file {
        tracing::info!(log_path = %path.display(), "Logging initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn writer_creates_parent_dirs_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("test.jsonl");

        let mut first = JsonlWriter::open(&path).unwrap();
        first.write_all(b"one\n").unwrap();
        let mut second = JsonlWriter::open(&path).unwrap();
        second.write_all(b"two\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[test]
    fn clones_share_one_file_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.jsonl");

        let writer = JsonlWriter::open(&path).unwrap();
        writer.make_writer().write_all(b"a\n").unwrap();
        writer.make_writer().write_all(b"b\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
