//! Error types for card acquisition.
//!
//! Backends report low-level failures as [`SubsystemFault`]. The card
//! session knows which protocol step was running and wraps the fault into
//! the matching [`AcquisitionError`] variant, so callers get one variant per
//! step regardless of the backend in use.

use crate::session::SessionState;
use cardprint_core::ReaderName;

/// Result type alias for card acquisition.
pub type Result<T> = std::result::Result<T, AcquisitionError>;

/// Result type alias for backend operations.
pub type FaultResult<T> = std::result::Result<T, SubsystemFault>;

/// A failure reported by a card subsystem backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct SubsystemFault {
    /// Backend operation that failed (e.g. "establish context").
    pub operation: &'static str,

    /// Backend-specific description.
    pub message: String,
}

impl SubsystemFault {
    /// Create a new subsystem fault.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Why the UID exchange did not produce a usable UID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransmitFailure {
    /// The command could not be exchanged with the card.
    #[error(transparent)]
    Exchange(SubsystemFault),

    /// The response did not even contain a status word.
    #[error("response too short ({len} bytes)")]
    ShortResponse { len: usize },

    /// Only a status word came back, so there is no UID to use.
    #[error("response carried no UID (status {sw:04X})")]
    EmptyUid { sw: u16 },
}

/// Errors that end a card session, one variant per protocol step.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// The card subsystem could not be opened or enumerated.
    #[error("Card subsystem unavailable: {source}")]
    Context {
        #[source]
        source: SubsystemFault,
    },

    /// No reader is attached.
    #[error("No card readers attached")]
    NoReaders,

    /// No card was placed on the reader before the wait expired.
    #[error("No card presented on {reader} within {timeout_ms}ms")]
    PresenceTimeout { reader: ReaderName, timeout_ms: u64 },

    /// Presence detection itself failed.
    #[error("Presence detection failed on {reader}: {source}")]
    Subsystem {
        reader: ReaderName,
        #[source]
        source: SubsystemFault,
    },

    /// The card is present but no connection could be opened.
    #[error("Failed to connect to card on {reader}: {source}")]
    Connect {
        reader: ReaderName,
        #[source]
        source: SubsystemFault,
    },

    /// The UID command/response exchange failed.
    #[error("UID exchange failed on {reader}: {reason}")]
    Transmit {
        reader: ReaderName,
        #[source]
        reason: TransmitFailure,
    },

    /// The session already reached a terminal state.
    #[error("Card session already finished ({state})")]
    SessionFinished { state: SessionState },
}

impl AcquisitionError {
    /// Create a new context error.
    pub fn context(source: SubsystemFault) -> Self {
        Self::Context { source }
    }

    /// Create a new presence timeout error.
    pub fn presence_timeout(reader: &ReaderName, timeout_ms: u64) -> Self {
        Self::PresenceTimeout {
            reader: reader.clone(),
            timeout_ms,
        }
    }

    /// Create a new presence detection error.
    pub fn subsystem(reader: &ReaderName, source: SubsystemFault) -> Self {
        Self::Subsystem {
            reader: reader.clone(),
            source,
        }
    }

    /// Create a new connect error.
    pub fn connect(reader: &ReaderName, source: SubsystemFault) -> Self {
        Self::Connect {
            reader: reader.clone(),
            source,
        }
    }

    /// Create a new transmit error.
    pub fn transmit(reader: &ReaderName, reason: TransmitFailure) -> Self {
        Self::Transmit {
            reader: reader.clone(),
            reason,
        }
    }

    /// Whether the operator simply did not present a card in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PresenceTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error() {
        let error = AcquisitionError::context(SubsystemFault::new(
            "establish context",
            "service not available",
        ));
        assert!(matches!(error, AcquisitionError::Context { .. }));
        assert_eq!(
            error.to_string(),
            "Card subsystem unavailable: establish context failed: service not available"
        );
    }

    #[test]
    fn test_presence_timeout_error() {
        let error = AcquisitionError::presence_timeout(&ReaderName::new("ACR122U"), 15000);
        assert!(error.is_timeout());
        assert_eq!(
            error.to_string(),
            "No card presented on ACR122U within 15000ms"
        );
    }

    #[test]
    fn test_transmit_error_empty_uid() {
        let error = AcquisitionError::transmit(
            &ReaderName::new("ACR122U"),
            TransmitFailure::EmptyUid { sw: 0x9000 },
        );
        assert_eq!(
            error.to_string(),
            "UID exchange failed on ACR122U: response carried no UID (status 9000)"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let error = AcquisitionError::connect(
            &ReaderName::new("OMNIKEY 5022"),
            SubsystemFault::new("connect", "sharing violation"),
        );
        let source = error.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connect failed: sharing violation"));
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            AcquisitionError::NoReaders,
            AcquisitionError::SessionFinished {
                state: SessionState::Closed,
            },
            AcquisitionError::transmit(
                &ReaderName::new("r"),
                TransmitFailure::ShortResponse { len: 1 },
            ),
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
