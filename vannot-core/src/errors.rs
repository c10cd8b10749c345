use std::io;
use thiserror::Error;

/// Error type shared across the vannot crates.
#[derive(Error, Debug)]
pub enum VannotError {
    /// Bad schema or column setup. Raised at construction, never mid-stream.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Encoded data inconsistent with its declared layout, or a sortedness
    /// violation in a stream that must be position-sorted. Fatal for the
    /// current file.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// A record field could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Requested chromosome absent from the index. Callers skip, not abort.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying read failure. Propagated, never retried here.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for vannot operations.
pub type Result<T> = std::result::Result<T, VannotError>;
