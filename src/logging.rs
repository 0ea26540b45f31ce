//! Log output.
//!
//! The TUI owns the terminal, so interactive sessions log to a file in the
//! data directory. One-shot runs log to stderr. Filtering is controlled by
//! the `LISTSYNC_LOG` environment variable (default `info`).

use color_eyre::{eyre::eyre, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "LISTSYNC_LOG";
const LOG_FILE: &str = "listsync.log";

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
  File(PathBuf),
  Stderr,
}

/// Keeps the file writer alive; dropping it flushes the log.
pub struct LoggingGuard {
  _file_guard: Option<WorkerGuard>,
}

/// Default log directory: `$XDG_DATA_HOME/listsync`, or `./logs` if unknown
pub fn default_log_dir() -> PathBuf {
  dirs::data_dir()
    .map(|d| d.join("listsync"))
    .unwrap_or_else(|| PathBuf::from("logs"))
}

pub fn init(target: LogTarget) -> Result<LoggingGuard> {
  let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  match target {
    LogTarget::File(dir) => {
      let (writer, guard) = file_writer(&dir)?;
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);
      tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(LoggingGuard {
        _file_guard: Some(guard),
      })
    }
    LogTarget::Stderr => {
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
      tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(LoggingGuard { _file_guard: None })
    }
  }
}

fn file_writer(dir: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
  fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
  let appender = tracing_appender::rolling::never(dir, LOG_FILE);
  Ok(tracing_appender::non_blocking(appender))
}
