//! Shared types, constants and configuration for the card personalization station.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{AppConfig, BatchConfig, PrintBackend, PrinterConfig, ReaderConfig};
pub use error::{Error, Result};
pub use types::*;
