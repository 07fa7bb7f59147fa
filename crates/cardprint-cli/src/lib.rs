//! Batch driver for the card personalization station.
//!
//! Reads enrollment codes from a file, reads a card UID for each one,
//! prints the card and appends `code,UID` to an output log.

pub mod batch;
pub mod error;
pub mod prompt;
pub mod records;

pub use batch::{BatchRunner, BatchSettings, BatchSummary, RecordOutcome};
pub use error::{BatchError, Result};
pub use prompt::{ConsolePrompt, NoPrompt, OperatorPrompt};
pub use records::{CsvSink, RecordSource};
