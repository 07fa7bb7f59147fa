//! Batch errors that stop the whole run.
//!
//! Per-card failures are not errors at this level; they are reported as
//! [`RecordOutcome`](crate::batch::RecordOutcome) values and the batch
//! moves on.

use std::io;
use std::path::PathBuf;

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The record source could not be read.
    #[error("Failed to read records from {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record source holds no identifiers.
    #[error("No records in {}", path.display())]
    EmptySource { path: PathBuf },

    /// The output log could not be opened for appending.
    #[error("Failed to open output {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A pairing could not be written to the output log.
    #[error("Failed to record {identifier}: {source}")]
    SinkWrite {
        identifier: String,
        #[source]
        source: io::Error,
    },

    /// The operator prompt failed.
    #[error("Operator prompt failed: {0}")]
    Prompt(#[source] io::Error),
}
