//! Card session state machine.
//!
//! A [`CardSession`] runs one complete UID acquisition: open a context with
//! the card service, pick a reader, wait for a card, connect, send the Get
//! UID command and tear everything down again.
//!
//! # States
//!
//! - `Unopened`: nothing acquired yet
//! - `ContextEstablished`: card service context open
//! - `ReaderChosen`: readers enumerated and one selected
//! - `AwaitingPresence`: waiting for the operator to place a card
//! - `Connected`: shared connection to the card open
//! - `UidRetrieved`: UID parsed from the response
//! - `Closed`: success, every handle released
//! - `Failed`: a step failed, every handle acquired so far released
//!
//! # Valid Transitions
//!
//! - Unopened → ContextEstablished → ReaderChosen → AwaitingPresence →
//!   Connected → UidRetrieved → Closed
//! - any non-terminal state → Failed
//!
//! # Release
//!
//! The context and the card connection are held by scope guards that
//! release them when dropped. Acquisition runs inside a single function
//! whose locals are those guards, so both are released on return no
//! matter which step failed, card first and context last.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use cardprint_core::PreferenceList;
//! use cardprint_hardware::mock::{MockCard, MockSubsystem};
//! use cardprint_hardware::session::{CardSession, SessionState};
//!
//! let (subsystem, handle) = MockSubsystem::new();
//! handle.attach_reader("ACS ACR122U");
//! handle.present_card("ACS ACR122U", MockCard::with_uid(&[0x04, 0x1A, 0x2B, 0x3C]));
//!
//! let mut session = CardSession::new(&subsystem);
//! let card = session
//!     .acquire_uid(&PreferenceList::default(), Duration::from_millis(100))
//!     .unwrap();
//!
//! assert_eq!(card.uid.to_compact_hex(), "041A2B3C");
//! assert_eq!(session.state(), SessionState::Closed);
//! assert!(handle.ledger().is_balanced());
//! ```

use crate::apdu::{GET_UID_APDU, parse_uid_response};
use crate::error::{AcquisitionError, Result, TransmitFailure};
use crate::selector;
use crate::traits::{CardConnection, CardSubsystem, ReaderContext};
use crate::types::{AcquiredCard, Presence};
use cardprint_core::{PreferenceList, ReaderName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// States of one acquisition transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unopened,
    ContextEstablished,
    ReaderChosen,
    AwaitingPresence,
    Connected,
    UidRetrieved,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Unopened => "Unopened",
            SessionState::ContextEstablished => "ContextEstablished",
            SessionState::ReaderChosen => "ReaderChosen",
            SessionState::AwaitingPresence => "AwaitingPresence",
            SessionState::Connected => "Connected",
            SessionState::UidRetrieved => "UidRetrieved",
            SessionState::Closed => "Closed",
            SessionState::Failed => "Failed",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardprint_hardware::session::SessionState;
    ///
    /// assert!(SessionState::Unopened.can_transition_to(&SessionState::ContextEstablished));
    /// assert!(SessionState::Connected.can_transition_to(&SessionState::Failed));
    /// assert!(!SessionState::Unopened.can_transition_to(&SessionState::Connected));
    /// assert!(!SessionState::Closed.can_transition_to(&SessionState::Failed));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Unopened, SessionState::ContextEstablished)
                | (SessionState::ContextEstablished, SessionState::ReaderChosen)
                | (SessionState::ReaderChosen, SessionState::AwaitingPresence)
                | (SessionState::AwaitingPresence, SessionState::Connected)
                | (SessionState::Connected, SessionState::UidRetrieved)
                | (SessionState::UidRetrieved, SessionState::Closed)
        ) || (!self.is_terminal() && *target == SessionState::Failed)
    }

    /// `Closed` and `Failed` end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// A single recorded state change.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Releases a reader context when dropped.
struct ContextGuard<C: ReaderContext> {
    context: C,
}

impl<C: ReaderContext> ContextGuard<C> {
    fn new(context: C) -> Self {
        Self { context }
    }
}

impl<C: ReaderContext> Deref for ContextGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.context
    }
}

impl<C: ReaderContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        match self.context.release() {
            Ok(()) => debug!("Card service context released"),
            Err(fault) => warn!("Error releasing card service context: {}", fault),
        }
    }
}

/// Disconnects a card, leaving it on the reader, when dropped.
struct CardGuard<'r, K: CardConnection> {
    connection: K,
    reader: &'r ReaderName,
}

impl<'r, K: CardConnection> CardGuard<'r, K> {
    fn new(connection: K, reader: &'r ReaderName) -> Self {
        Self { connection, reader }
    }
}

impl<K: CardConnection> Deref for CardGuard<'_, K> {
    type Target = K;

    fn deref(&self) -> &K {
        &self.connection
    }
}

impl<K: CardConnection> DerefMut for CardGuard<'_, K> {
    fn deref_mut(&mut self) -> &mut K {
        &mut self.connection
    }
}

impl<K: CardConnection> Drop for CardGuard<'_, K> {
    fn drop(&mut self) {
        match self.connection.disconnect() {
            Ok(()) => debug!("Disconnected from card on {}", self.reader),
            Err(fault) => warn!("Error disconnecting from card on {}: {}", self.reader, fault),
        }
    }
}

/// One UID acquisition transaction against a card subsystem.
///
/// A session is single-use: once it reaches `Closed` or `Failed`, a second
/// call to [`acquire_uid`](CardSession::acquire_uid) is rejected. Create a
/// new session per card.
pub struct CardSession<'s, S: CardSubsystem> {
    subsystem: &'s S,
    state: SessionState,
    history: Vec<StateTransition>,
    reader: Option<ReaderName>,
}

impl<'s, S: CardSubsystem> CardSession<'s, S> {
    /// Create a new session in the `Unopened` state.
    pub fn new(subsystem: &'s S) -> Self {
        Self {
            subsystem,
            state: SessionState::Unopened,
            history: Vec::with_capacity(8),
            reader: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every transition taken so far, oldest first.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Reader chosen by this session, once selection has happened.
    pub fn reader(&self) -> Option<&ReaderName> {
        self.reader.as_ref()
    }

    /// Acquire the UID of the next card placed on the preferred reader.
    ///
    /// Blocks for at most `timeout` waiting for the card. On return the
    /// session is `Closed` (success) or `Failed`, and every handle it
    /// opened has been released.
    ///
    /// # Errors
    ///
    /// One [`AcquisitionError`] variant per protocol step, or
    /// `SessionFinished` if this session was already used.
    pub fn acquire_uid(
        &mut self,
        preferences: &PreferenceList,
        timeout: Duration,
    ) -> Result<AcquiredCard> {
        if self.state != SessionState::Unopened {
            return Err(AcquisitionError::SessionFinished { state: self.state });
        }

        let result = self.run(preferences, timeout);

        match &result {
            Ok(card) => {
                self.advance(SessionState::Closed);
                info!(
                    "Read UID {} on {} ({} bytes)",
                    card.uid,
                    card.reader,
                    card.uid.len()
                );
            }
            Err(error) => {
                warn!("Card session failed in state {}: {}", self.state, error);
                self.advance(SessionState::Failed);
            }
        }

        result
    }

    fn run(&mut self, preferences: &PreferenceList, timeout: Duration) -> Result<AcquiredCard> {
        let subsystem = self.subsystem;

        let context = ContextGuard::new(
            subsystem
                .establish_context()
                .map_err(AcquisitionError::context)?,
        );
        self.advance(SessionState::ContextEstablished);

        let readers = context.list_readers().map_err(AcquisitionError::context)?;
        let selection =
            selector::select(&readers, preferences).ok_or(AcquisitionError::NoReaders)?;
        match selection.matched_term {
            Some(term) => info!(
                "Selected reader {} (matched {:?}, {} attached)",
                selection.reader,
                term,
                readers.len()
            ),
            None => info!(
                "No preferred reader attached, using first reader {} ({} attached)",
                selection.reader,
                readers.len()
            ),
        }
        let reader = selection.reader.clone();
        self.reader = Some(reader.clone());
        self.advance(SessionState::ReaderChosen);

        self.advance(SessionState::AwaitingPresence);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        debug!("Waiting up to {}ms for a card on {}", timeout_ms, reader);
        match context.wait_for_card(&reader, timeout) {
            Ok(Presence::Present) => {}
            Ok(Presence::Absent) => {
                return Err(AcquisitionError::presence_timeout(&reader, timeout_ms));
            }
            Err(fault) => return Err(AcquisitionError::subsystem(&reader, fault)),
        }

        let mut card = CardGuard::new(
            context
                .connect(&reader)
                .map_err(|fault| AcquisitionError::connect(&reader, fault))?,
            &reader,
        );
        self.advance(SessionState::Connected);

        let response = card.transmit(&GET_UID_APDU).map_err(|fault| {
            AcquisitionError::transmit(&reader, TransmitFailure::Exchange(fault))
        })?;
        let uid = parse_uid_response(&response)
            .map_err(|failure| AcquisitionError::transmit(&reader, failure))?;
        self.advance(SessionState::UidRetrieved);

        Ok(AcquiredCard::new(uid, reader.clone()))
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid card session transition {} -> {}",
            self.state,
            next
        );
        debug!("Card session {} -> {}", self.state, next);
        self.history.push(StateTransition::new(self.state, next));
        self.state = next;
    }
}

/// Run a fresh [`CardSession`] to completion.
///
/// # Errors
///
/// See [`CardSession::acquire_uid`].
pub fn acquire_uid<S: CardSubsystem>(
    subsystem: &S,
    preferences: &PreferenceList,
    timeout: Duration,
) -> Result<AcquiredCard> {
    CardSession::new(subsystem).acquire_uid(preferences, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCard, MockSubsystem};

    const UID: [u8; 4] = [0x04, 0x1A, 0x2B, 0x3C];

    fn states(session: &CardSession<'_, MockSubsystem>) -> Vec<SessionState> {
        session.history().iter().map(|t| t.to).collect()
    }

    #[test]
    fn test_successful_session_walks_every_state() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("ACS ACR122U PICC Interface");
        handle.present_card("ACS ACR122U PICC Interface", MockCard::with_uid(&UID));

        let mut session = CardSession::new(&subsystem);
        let card = session
            .acquire_uid(&PreferenceList::default(), Duration::from_millis(50))
            .unwrap();

        assert_eq!(card.uid.to_display_hex(), "04 1A 2B 3C");
        assert_eq!(card.reader.as_str(), "ACS ACR122U PICC Interface");
        assert_eq!(
            states(&session),
            vec![
                SessionState::ContextEstablished,
                SessionState::ReaderChosen,
                SessionState::AwaitingPresence,
                SessionState::Connected,
                SessionState::UidRetrieved,
                SessionState::Closed,
            ]
        );

        let ledger = handle.ledger();
        assert_eq!(ledger.contexts_established, 1);
        assert_eq!(ledger.contexts_released, 1);
        assert_eq!(ledger.cards_connected, 1);
        assert_eq!(ledger.cards_disconnected, 1);
        assert_eq!(ledger.commands, vec![GET_UID_APDU.to_vec()]);
    }

    #[test]
    fn test_context_failure_acquires_nothing() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.set_service_available(false);

        let mut session = CardSession::new(&subsystem);
        let result = session.acquire_uid(&PreferenceList::default(), Duration::ZERO);

        assert!(matches!(result, Err(AcquisitionError::Context { .. })));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(states(&session), vec![SessionState::Failed]);
        assert_eq!(handle.ledger().contexts_established, 0);
    }

    #[test]
    fn test_no_readers_releases_context() {
        let (subsystem, handle) = MockSubsystem::new();

        let mut session = CardSession::new(&subsystem);
        let result = session.acquire_uid(&PreferenceList::default(), Duration::ZERO);

        assert!(matches!(result, Err(AcquisitionError::NoReaders)));
        assert_eq!(session.reader(), None);

        let ledger = handle.ledger();
        assert_eq!(ledger.contexts_established, 1);
        assert_eq!(ledger.contexts_released, 1);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_presence_timeout_with_zero_wait() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");

        let started = Instant::now();
        let mut session = CardSession::new(&subsystem);
        let result = session.acquire_uid(&PreferenceList::default(), Duration::ZERO);

        assert!(started.elapsed() < Duration::from_millis(500));
        match result {
            Err(AcquisitionError::PresenceTimeout { reader, timeout_ms }) => {
                assert_eq!(reader.as_str(), "Generic Reader");
                assert_eq!(timeout_ms, 0);
            }
            other => panic!("expected presence timeout, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.history().last().map(|t| t.from),
            Some(SessionState::AwaitingPresence)
        );

        let ledger = handle.ledger();
        assert_eq!(ledger.cards_connected, 0);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_presence_polling_failure() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");
        handle.fail_presence_detection("Generic Reader", "reader unplugged");

        let result = acquire_uid(&subsystem, &PreferenceList::default(), Duration::from_millis(10));

        assert!(matches!(result, Err(AcquisitionError::Subsystem { .. })));
        assert!(handle.ledger().is_balanced());
    }

    #[test]
    fn test_connect_failure_releases_context() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");
        handle.present_card(
            "Generic Reader",
            MockCard::with_uid(&UID).refusing_connection("sharing violation"),
        );

        let result = acquire_uid(&subsystem, &PreferenceList::default(), Duration::from_millis(10));

        assert!(matches!(result, Err(AcquisitionError::Connect { .. })));
        let ledger = handle.ledger();
        assert_eq!(ledger.cards_connected, 0);
        assert_eq!(ledger.contexts_released, 1);
    }

    #[test]
    fn test_transmit_failure_releases_card_and_context() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");
        handle.present_card(
            "Generic Reader",
            MockCard::with_uid(&UID).failing_transmit("card removed"),
        );

        let mut session = CardSession::new(&subsystem);
        let result = session.acquire_uid(&PreferenceList::default(), Duration::from_millis(10));

        assert!(matches!(
            result,
            Err(AcquisitionError::Transmit {
                reason: TransmitFailure::Exchange(_),
                ..
            })
        ));
        assert_eq!(
            session.history().last().map(|t| t.from),
            Some(SessionState::Connected)
        );

        let ledger = handle.ledger();
        assert_eq!(ledger.cards_connected, 1);
        assert_eq!(ledger.cards_disconnected, 1);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_status_only_response_is_transmit_error() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");
        handle.present_card("Generic Reader", MockCard::with_response(&[0x90, 0x00]));

        let result = acquire_uid(&subsystem, &PreferenceList::default(), Duration::from_millis(10));

        assert!(matches!(
            result,
            Err(AcquisitionError::Transmit {
                reason: TransmitFailure::EmptyUid { sw: 0x9000 },
                ..
            })
        ));
        assert!(handle.ledger().is_balanced());
    }

    #[test]
    fn test_session_is_single_use() {
        let (subsystem, handle) = MockSubsystem::new();
        handle.attach_reader("Generic Reader");
        handle.present_card("Generic Reader", MockCard::with_uid(&UID));
        handle.present_card("Generic Reader", MockCard::with_uid(&UID));

        let mut session = CardSession::new(&subsystem);
        session
            .acquire_uid(&PreferenceList::default(), Duration::from_millis(10))
            .unwrap();

        let second = session.acquire_uid(&PreferenceList::default(), Duration::from_millis(10));
        assert!(matches!(
            second,
            Err(AcquisitionError::SessionFinished {
                state: SessionState::Closed
            })
        ));
        assert_eq!(handle.ledger().contexts_established, 1);
    }

    #[test]
    fn test_terminal_states_accept_no_transitions() {
        for terminal in [SessionState::Closed, SessionState::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&SessionState::Failed));
            assert!(!terminal.can_transition_to(&SessionState::Unopened));
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::AwaitingPresence.to_string(), "AwaitingPresence");
        assert_eq!(SessionState::UidRetrieved.to_string(), "UidRetrieved");
    }
}
