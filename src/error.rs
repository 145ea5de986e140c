//! Error types for `common-utils`
//!
//! This module defines the single error enum shared by every module of the crate,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains so callers can walk the
//! full cause of a failed commit or lock acquisition.

use crate::locations::LocationKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `common-utils`
#[derive(Debug, Error)]
pub enum CommonError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The final rename of an atomic write failed; the destination is unchanged
    #[error("Failed to commit atomic write to {}: {source}", path.display())]
    CommitFailed {
        /// Destination of the write
        path: PathBuf,
        /// Underlying rename error
        #[source]
        source: std::io::Error,
    },

    /// A named lock could not be acquired before the deadline
    #[error("Timed out after {waited:?} waiting for lock '{name}'")]
    LockTimeout {
        /// Name the lock was created with
        name: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// The platform lock primitive itself failed
    /// Preserves the underlying error source for full error chain transparency
    #[error("Lock error: {0}")]
    LockError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No usable base directory for a location
    #[error("Cannot resolve {kind} directory: {reason}")]
    LocationUnavailable {
        /// Which location was requested
        kind: LocationKind,
        /// Why resolution failed
        reason: String,
    },

    /// Application name cannot be used as a directory name
    #[error("Invalid application name: {0:?}")]
    InvalidAppName(String),

    /// An item with the same name already exists in a `NamedCollection`
    #[error("Duplicate name in collection: {0}")]
    DuplicateName(String),

    /// Text that is not a well-formed language tag
    #[error("Invalid language tag: {0:?}")]
    InvalidLanguageTag(String),

    /// Logging could not be initialized
    /// Preserves the underlying error source for full error chain transparency
    #[error("Logging error: {0}")]
    LoggingError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Windows API error
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),
}

/// Result type alias for `common-utils` operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Convert an error to a user-friendly message
///
/// Applications embedding this crate can show the returned text directly in a
/// dialog or on stderr. Each message ends with a hint about what to check.
pub fn get_user_friendly_error(error: &CommonError) -> String {
    match error {
        CommonError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        CommonError::CommitFailed { path, source } => {
            format!(
                "Could not save {}:\n\n{source}\n\n\
                 The previous version of the file was kept.\n\
                 Check that no other program holds the file open.",
                path.display()
            )
        }
        CommonError::LockTimeout { name, waited } => {
            format!(
                "Gave up waiting for '{name}' after {} seconds.\n\n\
                 Another process is still using the file.\n\
                 Close other instances and try again.",
                waited.as_secs()
            )
        }
        CommonError::LockError(_) => "Failed to lock a shared file.\n\n\
             Please ensure the temporary directory is writable."
            .to_string(),
        CommonError::LocationUnavailable { kind, reason } => {
            format!(
                "Cannot determine the {kind} directory: {reason}\n\n\
                 Please ensure HOME (or APPDATA/LOCALAPPDATA on Windows) is set."
            )
        }
        CommonError::InvalidAppName(name) => {
            format!(
                "Invalid application name: {name:?}\n\n\
                 Names must not be empty or contain path separators."
            )
        }
        CommonError::DuplicateName(name) => {
            format!(
                "An entry named '{name}' already exists.\n\n\
                 Choose a different name."
            )
        }
        CommonError::InvalidLanguageTag(tag) => {
            format!(
                "Invalid language tag: {tag:?}\n\n\
                 Use tags such as 'en', 'en-US' or 'zh-Hant-TW'."
            )
        }
        CommonError::LoggingError(e) => {
            format!(
                "Logging could not be started:\n\n{e}\n\n\
                 The application will continue without a log file."
            )
        }
        #[cfg(windows)]
        CommonError::WindowsApiError(e) => {
            format!(
                "A Windows API error occurred:\n\n{e}\n\n\
                 Please ensure your Windows installation is up to date."
            )
        }
    }
}
