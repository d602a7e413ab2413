// error.rs — Error types for the audit export sink.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or reading an exported audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the audit log file.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a record to the log.
    #[error("failed to append record: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// A record could not be serialized, or a line is not valid JSON.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The hash chain is broken; the log was edited after export.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },
}
