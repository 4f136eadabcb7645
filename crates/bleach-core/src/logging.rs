//! Logging infrastructure for bleach.
//!
//! Structured logging through the `tracing` ecosystem. The dashboard owns the
//! terminal while it runs, so nothing is written to stderr: events go to a
//! JSON lines file under `~/.bleach/logs/`.
//!
//! ## Example
//!
//! ```no_run
//! use bleach_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("bleach started");
//! tracing::debug!(operation = "System Updates", "starting operation");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{BleachError, Result};

/// File name prefix of the rolling log.
pub const LOG_FILE_NAME: &str = "bleach.log";

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
    log_dir: PathBuf,
}

impl LogGuard {
    /// Directory the log file is written to.
    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }
}

/// Initialize the bleach logging system.
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.bleach/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// `RUST_LOG` overrides the level when set.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| BleachError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bleach={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true)
        .with_file(verbose)
        .with_line_number(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| BleachError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
        log_dir,
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Root of the per-user bleach directory (`~/.bleach`).
pub fn bleach_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| BleachError::Internal {
        message: "home directory could not be determined".into(),
    })?;

    Ok(home.join(".bleach"))
}

/// Get the default log directory path.
///
/// Returns `~/.bleach/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(bleach_home()?.join("logs"))
}
