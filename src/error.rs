//! Centralized error types for mailsift.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsift library.
///
/// Per-message problems (missing header section, absent `From:`/`To:`,
/// undecodable escapes) are never errors: the message is dropped and
/// counted. `SiftError` covers only the I/O boundary around the engine.
#[derive(Error, Debug)]
pub enum SiftError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified archive does not exist.
    #[error("mbox archive not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience alias for `Result<T, SiftError>`.
pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `SiftError`
/// when no path context is available (rare — prefer `SiftError::io`).
impl From<std::io::Error> for SiftError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
