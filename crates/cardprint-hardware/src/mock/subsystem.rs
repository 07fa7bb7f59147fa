//! Mock card subsystem for testing and development.
//!
//! This module provides a simulated PC/SC stack that can be controlled
//! programmatically. Readers are attached by name, cards are queued per
//! reader, and every context and connection opened through the subsystem
//! is counted in a [`MockLedger`] so tests can check that nothing leaks.

use crate::error::{FaultResult, SubsystemFault};
use crate::traits::{CardConnection, CardSubsystem, ReaderContext};
use crate::types::Presence;
use cardprint_core::ReaderName;
use cardprint_core::constants::SW_SUCCESS;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// A card that can be presented to a mock reader.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardprint_hardware::mock::MockCard;
///
/// let card = MockCard::with_uid(&[0x04, 0x1A, 0x2B, 0x3C])
///     .arriving_after(Duration::from_millis(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCard {
    /// Full response to any command, status word included.
    response: Vec<u8>,

    /// Delay before the card enters the field.
    arrival: Duration,

    /// Fault message returned by `connect`.
    connect_fault: Option<String>,

    /// Fault message returned by `transmit`.
    transmit_fault: Option<String>,
}

impl MockCard {
    /// A card answering with `uid` followed by `90 00`.
    pub fn with_uid(uid: &[u8]) -> Self {
        let mut response = uid.to_vec();
        response.extend_from_slice(&SW_SUCCESS.to_be_bytes());
        Self::with_response(&response)
    }

    /// A card answering with exactly `response`.
    pub fn with_response(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            arrival: Duration::ZERO,
            connect_fault: None,
            transmit_fault: None,
        }
    }

    /// Delay the card's arrival in the field.
    pub fn arriving_after(mut self, delay: Duration) -> Self {
        self.arrival = delay;
        self
    }

    /// Make `connect` fail with `message`.
    pub fn refusing_connection(mut self, message: impl Into<String>) -> Self {
        self.connect_fault = Some(message.into());
        self
    }

    /// Make `transmit` fail with `message`.
    pub fn failing_transmit(mut self, message: impl Into<String>) -> Self {
        self.transmit_fault = Some(message.into());
        self
    }
}

/// Counters of everything opened and closed through a [`MockSubsystem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockLedger {
    pub contexts_established: usize,
    pub contexts_released: usize,
    pub cards_connected: usize,
    pub cards_disconnected: usize,

    /// Every command transmitted, in order.
    pub commands: Vec<Vec<u8>>,
}

impl MockLedger {
    /// Every context and connection opened has been closed again.
    pub fn is_balanced(&self) -> bool {
        self.contexts_established == self.contexts_released
            && self.cards_connected == self.cards_disconnected
    }
}

#[derive(Debug)]
struct MockReader {
    name: ReaderName,

    /// Cards in presentation order; `None` is a presentation that never comes.
    queue: VecDeque<Option<MockCard>>,

    /// Card currently in the field.
    current: Option<MockCard>,

    /// One-shot fault for the next presence wait.
    presence_fault: Option<String>,
}

#[derive(Debug)]
struct MockState {
    service_available: bool,
    readers: Vec<MockReader>,
    ledger: MockLedger,
}

impl MockState {
    fn reader_mut(&mut self, name: &ReaderName) -> Option<&mut MockReader> {
        self.readers.iter_mut().find(|reader| &reader.name == name)
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock card subsystem.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardprint_hardware::mock::{MockCard, MockSubsystem};
/// use cardprint_hardware::traits::{CardConnection, CardSubsystem, ReaderContext};
/// use cardprint_hardware::types::Presence;
///
/// let (subsystem, handle) = MockSubsystem::new();
/// handle.attach_reader("Mock Reader");
/// handle.present_card("Mock Reader", MockCard::with_uid(&[0xDE, 0xAD, 0xBE, 0xEF]));
///
/// let mut context = subsystem.establish_context().unwrap();
/// let readers = context.list_readers().unwrap();
/// assert_eq!(
///     context.wait_for_card(&readers[0], Duration::ZERO).unwrap(),
///     Presence::Present
/// );
///
/// let mut card = context.connect(&readers[0]).unwrap();
/// assert_eq!(card.transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00]).unwrap().len(), 6);
/// card.disconnect().unwrap();
/// context.release().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MockSubsystem {
    state: SharedState,
}

impl MockSubsystem {
    /// Create a mock subsystem with no readers attached.
    ///
    /// Returns a tuple of (MockSubsystem, MockSubsystemHandle) where the
    /// handle attaches readers and presents cards.
    pub fn new() -> (Self, MockSubsystemHandle) {
        let state = Arc::new(Mutex::new(MockState {
            service_available: true,
            readers: Vec::new(),
            ledger: MockLedger::default(),
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            MockSubsystemHandle { state },
        )
    }
}

impl Default for MockSubsystem {
    fn default() -> Self {
        Self::new().0
    }
}

impl CardSubsystem for MockSubsystem {
    type Context = MockContext;

    fn establish_context(&self) -> FaultResult<MockContext> {
        let mut state = lock(&self.state);
        if !state.service_available {
            return Err(SubsystemFault::new(
                "establish context",
                "card service not available",
            ));
        }
        state.ledger.contexts_established += 1;

        Ok(MockContext {
            state: Arc::clone(&self.state),
            released: false,
        })
    }
}

/// Context opened on a [`MockSubsystem`].
#[derive(Debug)]
pub struct MockContext {
    state: SharedState,
    released: bool,
}

impl ReaderContext for MockContext {
    type Connection = MockConnection;

    fn list_readers(&self) -> FaultResult<Vec<ReaderName>> {
        let state = lock(&self.state);
        Ok(state.readers.iter().map(|r| r.name.clone()).collect())
    }

    fn wait_for_card(&self, reader: &ReaderName, timeout: Duration) -> FaultResult<Presence> {
        let arrival = {
            let mut state = lock(&self.state);
            let mock = state
                .reader_mut(reader)
                .ok_or_else(|| SubsystemFault::new("get status change", "unknown reader"))?;

            if let Some(message) = mock.presence_fault.take() {
                return Err(SubsystemFault::new("get status change", message));
            }
            if mock.current.is_some() {
                return Ok(Presence::Present);
            }

            match mock.queue.pop_front() {
                Some(Some(card)) if card.arrival <= timeout => {
                    let arrival = card.arrival;
                    mock.current = Some(card);
                    Some(arrival)
                }
                // Arrives too late or never: the presentation is used up
                _ => None,
            }
        };

        match arrival {
            Some(delay) => {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                Ok(Presence::Present)
            }
            None => {
                if !timeout.is_zero() {
                    thread::sleep(timeout);
                }
                Ok(Presence::Absent)
            }
        }
    }

    fn connect(&self, reader: &ReaderName) -> FaultResult<MockConnection> {
        let mut state = lock(&self.state);
        let card = state
            .reader_mut(reader)
            .and_then(|mock| mock.current.take())
            .ok_or_else(|| SubsystemFault::new("connect", "no card in the field"))?;

        if let Some(message) = &card.connect_fault {
            return Err(SubsystemFault::new("connect", message.clone()));
        }
        state.ledger.cards_connected += 1;

        Ok(MockConnection {
            state: Arc::clone(&self.state),
            card,
            connected: true,
        })
    }

    fn release(&mut self) -> FaultResult<()> {
        if !self.released {
            self.released = true;
            lock(&self.state).ledger.contexts_released += 1;
        }
        Ok(())
    }
}

/// Connection opened by a [`MockContext`].
#[derive(Debug)]
pub struct MockConnection {
    state: SharedState,
    card: MockCard,
    connected: bool,
}

impl CardConnection for MockConnection {
    fn transmit(&mut self, command: &[u8]) -> FaultResult<Vec<u8>> {
        if !self.connected {
            return Err(SubsystemFault::new("transmit", "card disconnected"));
        }
        lock(&self.state).ledger.commands.push(command.to_vec());

        match &self.card.transmit_fault {
            Some(message) => Err(SubsystemFault::new("transmit", message.clone())),
            None => Ok(self.card.response.clone()),
        }
    }

    fn disconnect(&mut self) -> FaultResult<()> {
        if self.connected {
            self.connected = false;
            lock(&self.state).ledger.cards_disconnected += 1;
        }
        Ok(())
    }
}

/// Handle for controlling a [`MockSubsystem`].
#[derive(Debug, Clone)]
pub struct MockSubsystemHandle {
    state: SharedState,
}

impl MockSubsystemHandle {
    /// Attach a reader. Readers enumerate in attachment order.
    pub fn attach_reader(&self, name: impl Into<ReaderName>) {
        lock(&self.state).readers.push(MockReader {
            name: name.into(),
            queue: VecDeque::new(),
            current: None,
            presence_fault: None,
        });
    }

    /// Detach a reader and drop any cards queued on it.
    pub fn detach_reader(&self, name: impl Into<ReaderName>) {
        let name = name.into();
        lock(&self.state).readers.retain(|reader| reader.name != name);
    }

    /// Queue a card on `reader`. Each presence wait takes one queued card.
    ///
    /// Does nothing if no such reader is attached.
    pub fn present_card(&self, reader: impl Into<ReaderName>, card: MockCard) {
        let reader = reader.into();
        if let Some(mock) = lock(&self.state).reader_mut(&reader) {
            mock.queue.push_back(Some(card));
        }
    }

    /// Queue a presentation that never happens, so the next wait on
    /// `reader` times out.
    pub fn skip_presentation(&self, reader: impl Into<ReaderName>) {
        let reader = reader.into();
        if let Some(mock) = lock(&self.state).reader_mut(&reader) {
            mock.queue.push_back(None);
        }
    }

    /// Make the next presence wait on `reader` fail with `message`.
    pub fn fail_presence_detection(&self, reader: impl Into<ReaderName>, message: impl Into<String>) {
        let reader = reader.into();
        if let Some(mock) = lock(&self.state).reader_mut(&reader) {
            mock.presence_fault = Some(message.into());
        }
    }

    /// Simulate the card service starting or stopping.
    pub fn set_service_available(&self, available: bool) {
        lock(&self.state).service_available = available;
    }

    /// Snapshot of the ledger.
    pub fn ledger(&self) -> MockLedger {
        lock(&self.state).ledger.clone()
    }
}
