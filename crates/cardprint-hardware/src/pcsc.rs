//! PC/SC card subsystem backed by the system card service.
//!
//! Uses the `pcsc` crate, which talks to winscard on Windows, the
//! PCSC framework on macOS and pcsc-lite elsewhere. Enabled with the
//! `hardware-pcsc` feature.

use crate::error::{FaultResult, SubsystemFault};
use crate::traits::{CardConnection, CardSubsystem, ReaderContext};
use crate::types::Presence;
use cardprint_core::ReaderName;
use cardprint_core::constants::RESPONSE_BUFFER_LEN;
use pcsc::{Card, Context, Disposition, Protocols, ReaderState, Scope, ShareMode, State};
use std::ffi::CString;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

fn fault(operation: &'static str, error: pcsc::Error) -> SubsystemFault {
    SubsystemFault::new(operation, error.to_string())
}

/// Time left before `deadline`; `None` waits without limit.
fn remaining_wait(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
}

fn reader_cstring(operation: &'static str, reader: &ReaderName) -> FaultResult<CString> {
    CString::new(reader.as_str())
        .map_err(|_| SubsystemFault::new(operation, "reader name contains a NUL byte"))
}

/// The system PC/SC service.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcscSubsystem;

impl PcscSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl CardSubsystem for PcscSubsystem {
    type Context = PcscContext;

    fn establish_context(&self) -> FaultResult<PcscContext> {
        let context =
            Context::establish(Scope::User).map_err(|e| fault("establish context", e))?;
        debug!("PC/SC context established");
        Ok(PcscContext {
            inner: Some(context),
        })
    }
}

/// An established PC/SC context.
pub struct PcscContext {
    inner: Option<Context>,
}

impl PcscContext {
    fn context(&self, operation: &'static str) -> FaultResult<&Context> {
        self.inner
            .as_ref()
            .ok_or_else(|| SubsystemFault::new(operation, "context already released"))
    }
}

impl ReaderContext for PcscContext {
    type Connection = PcscConnection;

    fn list_readers(&self) -> FaultResult<Vec<ReaderName>> {
        let context = self.context("list readers")?;
        match context.list_readers_owned() {
            Ok(names) => Ok(names
                .iter()
                .map(|name| ReaderName::new(name.to_string_lossy()))
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(fault("list readers", e)),
        }
    }

    fn wait_for_card(&self, reader: &ReaderName, timeout: Duration) -> FaultResult<Presence> {
        let context = self.context("get status change")?;
        let name = reader_cstring("get status change", reader)?;
        let mut states = [ReaderState::new(name, State::UNAWARE)];
        // Timeouts too large for the clock wait indefinitely
        let deadline = Instant::now().checked_add(timeout);

        loop {
            let remaining = remaining_wait(deadline);
            match context.get_status_change(remaining, &mut states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => return Ok(Presence::Absent),
                Err(e) => return Err(fault("get status change", e)),
            }

            let event = states[0].event_state();
            trace!("Reader {} state {:?}", reader, event);
            if event.contains(State::PRESENT) {
                return Ok(Presence::Present);
            }
            if remaining.is_some_and(|left| left.is_zero()) {
                return Ok(Presence::Absent);
            }
            states[0].sync_current_state();
        }
    }

    fn connect(&self, reader: &ReaderName) -> FaultResult<PcscConnection> {
        let context = self.context("connect")?;
        let name = reader_cstring("connect", reader)?;
        let card = context
            .connect(&name, ShareMode::Shared, Protocols::ANY)
            .map_err(|e| fault("connect", e))?;
        Ok(PcscConnection { card: Some(card) })
    }

    fn release(&mut self) -> FaultResult<()> {
        match self.inner.take() {
            Some(context) => context
                .release()
                .map_err(|(_, e)| fault("release context", e)),
            None => Ok(()),
        }
    }
}

/// A shared connection to a card.
pub struct PcscConnection {
    card: Option<Card>,
}

impl CardConnection for PcscConnection {
    fn transmit(&mut self, command: &[u8]) -> FaultResult<Vec<u8>> {
        let card = self
            .card
            .as_ref()
            .ok_or_else(|| SubsystemFault::new("transmit", "card already disconnected"))?;
        let mut buffer = [0u8; RESPONSE_BUFFER_LEN];
        let response = card
            .transmit(command, &mut buffer)
            .map_err(|e| fault("transmit", e))?;
        Ok(response.to_vec())
    }

    fn disconnect(&mut self) -> FaultResult<()> {
        match self.card.take() {
            Some(card) => card
                .disconnect(Disposition::LeaveCard)
                .map_err(|(_, e)| fault("disconnect", e)),
            None => Ok(()),
        }
    }
}
