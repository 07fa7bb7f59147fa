//! Process-wide configuration.
//!
//! All settings are gathered into one immutable [`AppConfig`] value, built
//! once at start-up (defaults, then an optional TOML file, then command line
//! overrides) and passed by reference to the card session, the renderer and
//! the batch driver.
//!
//! # Examples
//!
//! ```
//! use cardprint_core::config::AppConfig;
//!
//! let config = AppConfig::from_toml_str(
//!     r#"
//!     [printer]
//!     target = "Zebra ZC300"
//!
//!     [reader]
//!     preferences = ["omnikey", "acr"]
//!     presence_timeout_ms = 5000
//!
//!     [card.primary]
//!     x_mm = 8.0
//!     y_mm = 12.0
//!     font_pt = 20
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.printer.target.as_deref(), Some("Zebra ZC300"));
//! assert_eq!(config.reader.presence_timeout().as_secs(), 5);
//! assert_eq!(config.card.surface.width_mm, 86.0);
//! ```

use crate::constants::{
    DEFAULT_DOCUMENT_NAME, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_PATH, DEFAULT_PRESENCE_TIMEOUT_MS,
    DEFAULT_PRINTER_DPI, DEFAULT_SPOOL_DIR,
};
use crate::error::{Error, Result};
use crate::types::{CardLayout, PreferenceList};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where finished print jobs are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintBackend {
    /// Pipe each job to the system spooler (`lp`).
    #[default]
    Spooler,

    /// Write each job as a PostScript file into `spool_dir`.
    Directory,
}

/// Output device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Destination printer; `None` uses the system default.
    pub target: Option<String>,

    pub backend: PrintBackend,

    /// Output directory for the `directory` backend.
    pub spool_dir: PathBuf,

    /// Horizontal resolution of the print surface in dots per inch.
    pub dpi_x: u32,

    /// Vertical resolution of the print surface in dots per inch.
    pub dpi_y: u32,

    /// Job title shown by the spooler.
    pub document_name: String,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            target: None,
            backend: PrintBackend::default(),
            spool_dir: PathBuf::from(DEFAULT_SPOOL_DIR),
            dpi_x: DEFAULT_PRINTER_DPI,
            dpi_y: DEFAULT_PRINTER_DPI,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
        }
    }
}

/// Card reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Ordered substrings used to pick a reader when several are attached.
    pub preferences: PreferenceList,

    /// How long to wait for a card to be placed, in milliseconds.
    pub presence_timeout_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            preferences: PreferenceList::default(),
            presence_timeout_ms: DEFAULT_PRESENCE_TIMEOUT_MS,
        }
    }
}

impl ReaderConfig {
    pub fn presence_timeout(&self) -> Duration {
        Duration::from_millis(self.presence_timeout_ms)
    }
}

/// Record source and sink locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// One enrollment code per line.
    pub input: PathBuf,

    /// Append-only `code,UIDHEX` log.
    pub output: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub printer: PrinterConfig,
    pub card: CardLayout,
    pub reader: ReaderConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Parse configuration from TOML text. Missing sections and keys keep
    /// their defaults.
    ///
    /// # Errors
    /// Returns `Error::ConfigParse` for malformed TOML or wrongly typed keys,
    /// and the `validate` errors for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>")
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, otherwise as
    /// [`AppConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| Error::ConfigParse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the destination printer.
    pub fn printer_target(mut self, target: impl Into<String>) -> Self {
        self.printer.target = Some(target.into());
        self
    }

    /// Set the reader preference terms.
    pub fn preferences(mut self, preferences: PreferenceList) -> Self {
        self.reader.preferences = preferences;
        self
    }

    /// Set the presence wait timeout.
    pub fn presence_timeout(mut self, timeout: Duration) -> Self {
        self.reader.presence_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.card.validate()?;

        if self.printer.dpi_x == 0 {
            return Err(Error::invalid_value("printer.dpi_x", "must be positive"));
        }
        if self.printer.dpi_y == 0 {
            return Err(Error::invalid_value("printer.dpi_y", "must be positive"));
        }
        if self
            .printer
            .target
            .as_deref()
            .is_some_and(|target| target.trim().is_empty())
        {
            return Err(Error::invalid_value(
                "printer.target",
                "must not be blank; omit it to use the default printer",
            ));
        }
        if self.printer.document_name.trim().is_empty() {
            return Err(Error::invalid_value("printer.document_name", "must not be blank"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldLayout;
    use std::io::Write;

    #[test]
    fn test_default_config_matches_reference_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.printer.target, None);
        assert_eq!(config.printer.backend, PrintBackend::Spooler);
        assert_eq!(config.printer.document_name, "CardPrintJob");
        assert_eq!(config.reader.presence_timeout(), Duration::from_secs(15));
        assert_eq!(config.batch.input, PathBuf::from("input.csv"));
        assert_eq!(config.batch.output, PathBuf::from("output.csv"));
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_card_section() {
        let config = AppConfig::from_toml_str(
            r#"
            [card]
            width_mm = 85.6

            [card.secondary]
            x_mm = 5.0
            y_mm = 40.0
            font_pt = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.card.surface.width_mm, 85.6);
        assert_eq!(config.card.surface.height_mm, 54.0);
        assert_eq!(config.card.primary, FieldLayout::new(10.0, 10.0, 18));
        assert_eq!(config.card.secondary, FieldLayout::new(5.0, 40.0, 10));
    }

    #[test]
    fn test_backend_directory() {
        let config = AppConfig::from_toml_str(
            r#"
            [printer]
            backend = "directory"
            spool_dir = "/tmp/cards"
            dpi_x = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.printer.backend, PrintBackend::Directory);
        assert_eq!(config.printer.spool_dir, PathBuf::from("/tmp/cards"));
        assert_eq!(config.printer.dpi_x, 600);
        assert_eq!(config.printer.dpi_y, 300);
    }

    #[test]
    fn test_preferences_are_normalized() {
        let config = AppConfig::from_toml_str(
            r#"
            [reader]
            preferences = ["OMNIKEY", "ACR"]
            "#,
        )
        .unwrap();

        let terms: Vec<_> = config.reader.preferences.iter().collect();
        assert_eq!(terms, vec!["omnikey", "acr"]);
    }

    #[test]
    fn test_blank_preference_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [reader]
            preferences = ["omnikey", ""]
            "#,
        );
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_zero_dpi_rejected() {
        let result = AppConfig::from_toml_str("[printer]\ndpi_y = 0\n");
        assert!(matches!(result, Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn test_blank_printer_target_rejected() {
        let config = AppConfig::default().printer_target("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reader]\npresence_timeout_ms = 250").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.reader.presence_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/nonexistent/cardprint.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_builder_setters() {
        let config = AppConfig::default()
            .printer_target("Evolis Primacy")
            .preferences(PreferenceList::new(["acr"]).unwrap())
            .presence_timeout(Duration::from_millis(1500));

        assert_eq!(config.printer.target.as_deref(), Some("Evolis Primacy"));
        assert_eq!(config.reader.preferences.len(), 1);
        assert_eq!(config.reader.presence_timeout_ms, 1500);
    }
}
