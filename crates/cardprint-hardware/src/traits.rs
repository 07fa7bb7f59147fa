//! Card subsystem trait definitions.
//!
//! These traits are the seam between the card session state machine and a
//! concrete smart card stack. They follow the resource hierarchy of PC/SC:
//! a [`CardSubsystem`] opens a [`ReaderContext`], the context enumerates
//! readers, waits for cards and opens a [`CardConnection`] to one of them.
//!
//! Every method is blocking. The session runs one transaction at a time on
//! the calling thread, so there is nothing to gain from an async interface
//! here.
//!
//! Backends report failures as [`SubsystemFault`]; the session maps them to
//! the step-specific [`AcquisitionError`](crate::AcquisitionError) variant.
//!
//! # Release
//!
//! `release` and `disconnect` are called exactly once by the session's
//! scope guards, on success and on every failure path. Implementations
//! should still make them idempotent and tolerate being dropped without
//! them.
//!
//! # Examples
//!
//! ```
//! use cardprint_core::ReaderName;
//! use cardprint_hardware::error::FaultResult;
//! use cardprint_hardware::traits::{CardSubsystem, ReaderContext};
//!
//! fn attached_readers<S: CardSubsystem>(subsystem: &S) -> FaultResult<Vec<ReaderName>> {
//!     let mut context = subsystem.establish_context()?;
//!     let readers = context.list_readers();
//!     context.release()?;
//!     readers
//! }
//! ```

use crate::error::FaultResult;
use crate::types::Presence;
use cardprint_core::ReaderName;
use std::time::Duration;

/// Entry point to a smart card stack.
pub trait CardSubsystem {
    /// Context type opened by this subsystem.
    type Context: ReaderContext;

    /// Open a new context with the card service.
    ///
    /// # Errors
    ///
    /// Returns a fault if the card service is not running or refuses the
    /// connection.
    fn establish_context(&self) -> FaultResult<Self::Context>;
}

/// An open context with the card service.
pub trait ReaderContext {
    /// Connection type opened to a card.
    type Connection: CardConnection;

    /// Enumerate attached readers in subsystem order.
    ///
    /// An empty list is a valid answer and not a fault.
    fn list_readers(&self) -> FaultResult<Vec<ReaderName>>;

    /// Block until a card is present on `reader` or `timeout` elapses.
    ///
    /// Returns [`Presence::Present`] as soon as a card is detected and
    /// [`Presence::Absent`] once the timeout has elapsed with no card. A
    /// zero timeout checks the current state once and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns a fault if presence polling fails or the reader disappears.
    fn wait_for_card(&self, reader: &ReaderName, timeout: Duration) -> FaultResult<Presence>;

    /// Open a shared connection to the card on `reader`, negotiating any
    /// protocol supported by both card and reader.
    fn connect(&self, reader: &ReaderName) -> FaultResult<Self::Connection>;

    /// Release the context.
    fn release(&mut self) -> FaultResult<()>;
}

/// An open connection to a card.
pub trait CardConnection {
    /// Send a command APDU and return the full response, status word
    /// included.
    fn transmit(&mut self, command: &[u8]) -> FaultResult<Vec<u8>>;

    /// Disconnect, leaving the card powered and in place on the reader.
    fn disconnect(&mut self) -> FaultResult<()>;
}
