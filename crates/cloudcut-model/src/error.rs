//! Ingest-specific error types.

use thiserror::Error;

/// Errors that can occur while reading an audit-log export.
///
/// Failures inside a single row (unparseable timestamp, malformed embedded
/// JSON) are not errors: they are logged and the affected fields are left
/// empty, so one bad row never sinks the file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file could not be opened or read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV structure could not be parsed (including the header row).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, IngestError>;
