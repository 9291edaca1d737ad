use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or parsing a status report.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to read status file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("status file is empty")]
    Empty,

    #[error("unrecognized status format: expected client list header, got {0:?}")]
    UnrecognizedFormat(String),

    #[error("status file is truncated: missing END trailer")]
    Truncated,
}

/// Result type alias using this crate's error.
pub type Result<T> = std::result::Result<T, StatusError>;
