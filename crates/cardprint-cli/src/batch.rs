//! Sequential batch driver.
//!
//! For each record: prompt the operator, read the card UID, print the card
//! and append the pairing to the output log. A record whose card cannot be
//! read or printed is logged and skipped; nothing is written for it.

use crate::error::{BatchError, Result};
use crate::prompt::OperatorPrompt;
use crate::records::{CsvSink, RecordSource};
use cardprint_core::{CardLayout, PreferenceList, ReaderName, UidBytes};
use cardprint_hardware::{AcquisitionError, CardSession, CardSubsystem};
use cardprint_render::{CardRenderer, PrintTarget, RenderError};
use std::io::Write;
use std::time::Duration;
use tracing::{error, info, warn};

/// What happened to one record.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Card read, printed and logged.
    Recorded {
        identifier: String,
        uid: UidBytes,
        reader: ReaderName,
    },

    /// The UID could not be read.
    AcquisitionFailed {
        identifier: String,
        error: AcquisitionError,
    },

    /// The UID was read but the card could not be printed.
    RenderFailed {
        identifier: String,
        uid: UidBytes,
        error: RenderError,
    },
}

impl RecordOutcome {
    pub fn identifier(&self) -> &str {
        match self {
            RecordOutcome::Recorded { identifier, .. }
            | RecordOutcome::AcquisitionFailed { identifier, .. }
            | RecordOutcome::RenderFailed { identifier, .. } => identifier,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-card settings shared by every record.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub preferences: PreferenceList,
    pub presence_timeout: Duration,
    pub layout: CardLayout,
}

/// Drives records through acquisition, rendering and the output log.
pub struct BatchRunner<'a, S: CardSubsystem, T: PrintTarget> {
    subsystem: &'a S,
    renderer: &'a CardRenderer<T>,
    settings: BatchSettings,
}

impl<'a, S: CardSubsystem, T: PrintTarget> BatchRunner<'a, S, T> {
    pub fn new(subsystem: &'a S, renderer: &'a CardRenderer<T>, settings: BatchSettings) -> Self {
        Self {
            subsystem,
            renderer,
            settings,
        }
    }

    /// Read, print and classify one record without touching the log.
    pub fn process_record(&self, identifier: &str) -> RecordOutcome {
        let mut session = CardSession::new(self.subsystem);
        let card = match session
            .acquire_uid(&self.settings.preferences, self.settings.presence_timeout)
        {
            Ok(card) => card,
            Err(error) => {
                return RecordOutcome::AcquisitionFailed {
                    identifier: identifier.to_string(),
                    error,
                };
            }
        };

        let uid_text = card.uid.to_display_hex();
        match self
            .renderer
            .render(identifier, &uid_text, &self.settings.layout)
        {
            Ok(_) => RecordOutcome::Recorded {
                identifier: identifier.to_string(),
                uid: card.uid,
                reader: card.reader,
            },
            Err(error) => RecordOutcome::RenderFailed {
                identifier: identifier.to_string(),
                uid: card.uid,
                error,
            },
        }
    }

    /// Process every record in `source` in order.
    ///
    /// # Errors
    ///
    /// Only for failures that make continuing pointless: the prompt or the
    /// output log breaking. Per-card failures are counted in the summary.
    pub fn run<W: Write, P: OperatorPrompt + ?Sized>(
        &self,
        source: &RecordSource,
        sink: &mut CsvSink<W>,
        prompt: &mut P,
    ) -> Result<BatchSummary> {
        let total = source.len();
        let mut summary = BatchSummary::default();

        for (index, identifier) in source.identifiers().iter().enumerate() {
            prompt
                .await_card(identifier, index, total)
                .map_err(BatchError::Prompt)?;

            let outcome = self.process_record(identifier);
            summary.processed += 1;

            match &outcome {
                RecordOutcome::Recorded {
                    identifier,
                    uid,
                    reader,
                } => {
                    sink.record(identifier, uid)
                        .map_err(|source| BatchError::SinkWrite {
                            identifier: identifier.clone(),
                            source,
                        })?;
                    summary.succeeded += 1;
                    info!("Recorded {} -> {} (reader: {})", identifier, uid, reader);
                }
                RecordOutcome::AcquisitionFailed { identifier, error } => {
                    summary.failed += 1;
                    if error.is_timeout() {
                        warn!("Skipping {}: {}", identifier, error);
                    } else {
                        error!("Skipping {}: UID read failed: {}", identifier, error);
                    }
                }
                RecordOutcome::RenderFailed {
                    identifier,
                    uid,
                    error,
                } => {
                    summary.failed += 1;
                    error!("Skipping {} (UID {}): print failed: {}", identifier, uid, error);
                }
            }
        }

        info!(
            "Batch finished: {} processed, {} recorded, {} failed",
            summary.processed, summary.succeeded, summary.failed
        );
        Ok(summary)
    }
}
