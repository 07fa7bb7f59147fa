//! Card reader layer for the card personalization station.
//!
//! This crate reads the UID of a contactless card through a PC/SC style
//! card subsystem. It provides the subsystem traits, a session state machine
//! that runs one acquisition at a time, a reader selection heuristic and
//! two backends: a programmable mock and the system PC/SC service.
//!
//! # Design Philosophy
//!
//! - **Blocking**: one card is handled at a time on the calling thread, so
//!   the traits are plain synchronous methods.
//! - **Release on every path**: the session holds contexts and card
//!   connections in scope guards, so nothing stays open after a failure.
//! - **Error per step**: each protocol step fails with its own
//!   [`AcquisitionError`] variant.
//!
//! # Acquiring a UID
//!
//! ```
//! use std::time::Duration;
//! use cardprint_core::PreferenceList;
//! use cardprint_hardware::acquire_uid;
//! use cardprint_hardware::mock::{MockCard, MockSubsystem};
//!
//! let (subsystem, handle) = MockSubsystem::new();
//! handle.attach_reader("HID Global OMNIKEY 5022 Smart Card Reader");
//! handle.present_card(
//!     "HID Global OMNIKEY 5022 Smart Card Reader",
//!     MockCard::with_uid(&[0x04, 0x1A, 0x2B, 0x3C]),
//! );
//!
//! let card = acquire_uid(&subsystem, &PreferenceList::default(), Duration::from_secs(1))?;
//! assert_eq!(card.uid.to_display_hex(), "04 1A 2B 3C");
//! # Ok::<(), cardprint_hardware::AcquisitionError>(())
//! ```
//!
//! # Backends
//!
//! - [`mock::MockSubsystem`] is always available and is used by the tests
//!   and by the CLI's simulation mode.
//! - `pcsc::PcscSubsystem` requires the `hardware-pcsc` feature.

pub mod apdu;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc;
pub mod selector;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{AcquisitionError, FaultResult, Result, SubsystemFault, TransmitFailure};
pub use selector::select_reader;
pub use session::{CardSession, SessionState, StateTransition, acquire_uid};
pub use traits::{CardConnection, CardSubsystem, ReaderContext};
pub use types::{AcquiredCard, Presence};

#[cfg(feature = "hardware-pcsc")]
pub use pcsc::PcscSubsystem;
