//! Card face rendering for the card personalization station.
//!
//! Converts a card layout given in millimeters and points into device
//! units and draws it onto a print surface: a frame the size of the card,
//! the enrollment code in bold and the card UID below it.
//!
//! # Targets
//!
//! - [`postscript::PostScriptTarget`] builds a PostScript job and hands it
//!   to `lp` or writes it into a spool directory.
//! - [`recording::RecordingTarget`] records every call in memory, for tests
//!   and dry runs.
//!
//! # Examples
//!
//! ```
//! use cardprint_core::CardLayout;
//! use cardprint_render::{CardRenderer, RecordingTarget, Resolution};
//!
//! let target = RecordingTarget::new(Resolution::uniform(300));
//! let placement = CardRenderer::new(target)
//!     .render("000123", "04 1A 2B 3C", &CardLayout::default())?;
//!
//! assert_eq!(placement.primary_origin.x, 118);
//! # Ok::<(), cardprint_render::RenderError>(())
//! ```

pub mod error;
pub mod postscript;
pub mod recording;
pub mod renderer;
pub mod surface;
pub mod units;

pub use error::{DeviceFault, RenderError, Result};
pub use postscript::{PostScriptTarget, SpoolMode};
pub use recording::RecordingTarget;
pub use renderer::{CardRenderer, PagePlacement};
pub use surface::{PrintSurface, PrintTarget};
pub use units::{Axis, Resolution, points_to_device_units, to_device_units};
