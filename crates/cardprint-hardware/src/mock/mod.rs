//! Mock card subsystem for testing and development.
//!
//! This module provides a simulated card stack that can be controlled
//! programmatically without requiring a reader or the card service.

pub mod subsystem;

pub use subsystem::{
    MockCard, MockConnection, MockContext, MockLedger, MockSubsystem, MockSubsystemHandle,
};
