//! Reference constants for card acquisition and card-face rendering.
//!
//! These values mirror the reference deployment: a CR80-sized card
//! (86.0mm × 54.0mm), an enrollment code printed bold near the top-left
//! corner, the card UID printed below it, and a 15 second window for the
//! operator to place the card on the reader.
//!
//! They are only defaults. Every value that affects behavior is carried by
//! [`AppConfig`](crate::config::AppConfig) at runtime, so nothing in the
//! acquisition or rendering path reads these directly.
//!
//! # Usage
//!
//! ```
//! use cardprint_core::constants::*;
//!
//! assert_eq!(GET_UID_APDU, [0xFF, 0xCA, 0x00, 0x00, 0x00]);
//! assert_eq!(STATUS_WORD_LEN, 2);
//!
//! use std::time::Duration;
//! let timeout = Duration::from_millis(DEFAULT_PRESENCE_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 15);
//! ```

// ============================================================================
// Card Protocol
// ============================================================================

/// "Get Data" command returning the card UID.
///
/// CLA `FF` (reader pseudo-APDU), INS `CA`, P1 `00` (UID), P2 `00`,
/// Le `00` (return all bytes). Supported by the firmware of most PC/SC
/// contactless readers.
pub const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Length of the status word (SW1 SW2) trailing every APDU response.
pub const STATUS_WORD_LEN: usize = 2;

/// Status word returned when a command completed normally.
pub const SW_SUCCESS: u16 = 0x9000;

/// Receive buffer size for a single short APDU response.
///
/// 256 data bytes plus the status word.
pub const RESPONSE_BUFFER_LEN: usize = 258;

/// Typical minimum UID length in bytes (ISO 14443 single size).
pub const MIN_UID_LENGTH: usize = 4;

/// Typical maximum UID length in bytes (ISO 14443 triple size).
pub const MAX_UID_LENGTH: usize = 10;

// ============================================================================
// Timeouts
// ============================================================================

/// Default time the operator has to place a card on the reader.
pub const DEFAULT_PRESENCE_TIMEOUT_MS: u64 = 15_000;

// ============================================================================
// Reader Selection
// ============================================================================

/// Default reader preference terms, highest priority first.
///
/// The last entry fuses three intended terms ("dual", "usbccid", "wudf")
/// into a single literal. It is kept exactly as deployed: the selector
/// matches it as one substring, which in practice never hits.
pub const DEFAULT_READER_PREFERENCES: &[&str] =
    &["duali", "idp", "smart", "omnikey", "dualusbccidwudf"];

// ============================================================================
// Geometry
// ============================================================================

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Typographic points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Card width (CR80, ISO/IEC 7810 ID-1) in millimeters.
pub const DEFAULT_CARD_WIDTH_MM: f64 = 86.0;

/// Card height (CR80, ISO/IEC 7810 ID-1) in millimeters.
pub const DEFAULT_CARD_HEIGHT_MM: f64 = 54.0;

/// Enrollment code field: (x mm, y mm, font pt).
pub const DEFAULT_PRIMARY_FIELD: (f64, f64, u16) = (10.0, 10.0, 18);

/// UID field: (x mm, y mm, font pt).
pub const DEFAULT_SECONDARY_FIELD: (f64, f64, u16) = (10.0, 30.0, 12);

// ============================================================================
// Printing
// ============================================================================

/// Title given to every submitted print job.
pub const DEFAULT_DOCUMENT_NAME: &str = "CardPrintJob";

/// Resolution assumed for the PostScript surface when none is configured.
pub const DEFAULT_PRINTER_DPI: u32 = 300;

/// Directory used by the directory spool backend when none is configured.
pub const DEFAULT_SPOOL_DIR: &str = "jobs";

// ============================================================================
// Batch I/O
// ============================================================================

/// Default record source (one enrollment code per line).
pub const DEFAULT_INPUT_PATH: &str = "input.csv";

/// Default append-only output (`code,UIDHEX` per line).
pub const DEFAULT_OUTPUT_PATH: &str = "output.csv";
