//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to `<log dir>/<app>.log` (see
//! [`Locations::log_dir`]) and rotates previous sessions on startup, keeping ten
//! files in total.

use crate::error::{CommonError, Result, StringError};
use crate::locations::{LocationKind, Locations};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (`<app>.log.1` through `<app>.log.9`)
const MAX_LOG_FILES: u8 = 9;

/// Initialize the global `tracing` subscriber for the application behind `locations`
///
/// Log level defaults to INFO but can be configured via the `RUST_LOG` environment
/// variable. Fails with [`CommonError::LoggingError`] if a global subscriber is
/// already installed.
pub fn init_logging(locations: &Locations) -> Result<()> {
    let log_dir = locations.ensure_dir(LocationKind::Log)?;
    let app = locations.app_name();

    rotate_logs_on_startup(&log_dir.join(format!("{app}.log")))?;

    // Rotation happens above, once per start, so the appender itself never rolls
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(app)
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|e| CommonError::LoggingError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false) // No color codes in a file
        .with_target(true) // Include target module
        .with_thread_ids(true) // Thread id on every line
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CommonError::LoggingError(Box::new(e)))?;

    tracing::info!(
        app,
        log_dir = %log_dir.display(),
        "Logging started (common-utils v{})",
        env!("CARGO_PKG_VERSION")
    );

    Ok(())
}

/// Shift `<name>.N` to `<name>.N+1` for every existing file, then `<name>` to `<name>.1`
///
/// `<name>.9` is deleted first. A missing current log is not an error.
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let log_dir = log_path
        .parent()
        .ok_or_else(|| CommonError::LoggingError(StringError::new("Invalid log path")))?;
    let log_name = log_path
        .file_name()
        .ok_or_else(|| CommonError::LoggingError(StringError::new("Invalid log filename")))?
        .to_string_lossy();

    let oldest_log = log_dir.join(format!("{log_name}.{MAX_LOG_FILES}"));
    if oldest_log.exists() {
        std::fs::remove_file(&oldest_log)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let current_log = log_dir.join(format!("{log_name}.{i}"));
        if current_log.exists() {
            std::fs::rename(&current_log, log_dir.join(format!("{log_name}.{}", i + 1)))?;
        }
    }

    std::fs::rename(log_path, log_dir.join(format!("{log_name}.1")))?;

    Ok(())
}
