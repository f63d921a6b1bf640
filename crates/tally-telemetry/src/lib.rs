//! Tracing setup shared by Tally binaries.
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default: info for Tally
//! crates, warn for everything else). Setting `TALLY_LOG_DIR` adds a plain
//! text log file in that directory:
//!
//! ```bash
//! RUST_LOG=tally_client=debug TALLY_LOG_DIR=/tmp tally show Groceries
//! # writes /tmp/tally.log alongside stderr
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming the directory for the log file.
pub const LOG_DIR_ENV: &str = "TALLY_LOG_DIR";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "tally_core=info,tally_client=info,tally_cli=info,warn";

/// Keeps the file writer flushing. Hold it until the program exits.
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    _file: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl TracingGuard {
    /// Path of the log file, when file logging is on.
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}

/// Interpret a `TALLY_LOG_DIR` value. Empty means unset.
fn log_dir_from(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory for the log file, if `TALLY_LOG_DIR` is set.
pub fn log_dir() -> Option<PathBuf> {
    log_dir_from(std::env::var(LOG_DIR_ENV).ok())
}

/// Install the global subscriber. `app` names the log file (`{app}.log`).
///
/// Calling this twice leaves the first subscriber in place.
pub fn init_tracing(app: &str) -> TracingGuard {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match log_dir() {
        Some(dir) => {
            let file_name = format!("{app}.log");
            let appender = tracing_appender::rolling::never(&dir, &file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            let log_file = dir.join(file_name);
            tracing::debug!(path = %log_file.display(), "file logging enabled");
            TracingGuard {
                _file: Some(guard),
                log_file: Some(log_file),
            }
        }
        None => {
            let _ = tracing_subscriber::registry().with(filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            TracingGuard {
                _file: None,
                log_file: None,
            }
        }
    }
}
