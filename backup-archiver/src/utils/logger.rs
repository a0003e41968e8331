//! Logging configuration using tracing.
//!
//! Events go to an append-only text log, one line per event:
//! local timestamp, severity, message.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt::time::ChronoLocal, layer::SubscriberExt, EnvFilter};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "backup.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Keeps the file subscriber installed; dropping it tears logging down.
#[must_use = "logging stops when the guard is dropped"]
pub struct LogGuard {
    _default: DefaultGuard,
}

/// Install a subscriber that appends to `log_file` for the current thread.
///
/// `RUST_LOG` takes precedence over `level`; an unparsable level falls
/// back to `info`.
pub fn init(level: &str, log_file: &Path) -> anyhow::Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file '{}'", log_file.display()))?;

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
    );

    Ok(LogGuard {
        _default: tracing::subscriber::set_default(subscriber),
    })
}
