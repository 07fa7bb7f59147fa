use crate::{
    Result,
    constants::{
        DEFAULT_CARD_HEIGHT_MM, DEFAULT_CARD_WIDTH_MM, DEFAULT_PRIMARY_FIELD,
        DEFAULT_READER_PREFERENCES, DEFAULT_SECONDARY_FIELD,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an attached card reader, as enumerated by the card subsystem.
///
/// Opaque and not stable across reconnections: the same physical reader may
/// come back under a different name (a changed slot index, for example).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReaderName(String);

impl ReaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring test against an already lowercased term.
    #[must_use]
    pub fn matches_term(&self, lowercase_term: &str) -> bool {
        self.0.to_lowercase().contains(lowercase_term)
    }
}

impl fmt::Display for ReaderName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReaderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ReaderName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Ordered reader preference terms, highest priority first.
///
/// Terms are lowercased on construction and otherwise kept literally. A term
/// that accidentally fuses two words (`"dualusbccid"`) is matched as written;
/// nothing here tries to split it back apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PreferenceList(Vec<String>);

impl PreferenceList {
    /// Build a preference list from raw terms.
    ///
    /// Terms are trimmed and lowercased; nothing else about them changes.
    ///
    /// # Errors
    /// Returns `Error::InvalidPreference` if a term is empty or only
    /// whitespace, since an empty substring would match every reader.
    pub fn new<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms = terms
            .into_iter()
            .map(|term| {
                let term = term.into();
                let normalized = term.trim().to_lowercase();
                if normalized.is_empty() {
                    Err(Error::InvalidPreference(term))
                } else {
                    Ok(normalized)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(terms))
    }

    /// An empty list; selection then always falls back to the first reader.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PreferenceList {
    fn default() -> Self {
        Self(
            DEFAULT_READER_PREFERENCES
                .iter()
                .map(|term| (*term).to_string())
                .collect(),
        )
    }
}

impl TryFrom<Vec<String>> for PreferenceList {
    type Error = Error;

    fn try_from(terms: Vec<String>) -> Result<Self> {
        Self::new(terms)
    }
}

impl From<PreferenceList> for Vec<String> {
    fn from(list: PreferenceList) -> Self {
        list.0
    }
}

/// Raw UID bytes reported by a card, status word already removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UidBytes(Vec<u8>);

impl UidBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex string, with or without whitespace between byte pairs.
    ///
    /// # Errors
    /// Returns `Error::InvalidHex` for an odd digit count or a non-hex digit.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidHex(format!("invalid hex digit in {text:?}")));
        }
        if digits.len() % 2 != 0 {
            return Err(Error::InvalidHex(format!(
                "odd number of hex digits in {text:?}"
            )));
        }

        (0..digits.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&digits[i..i + 2], 16)
                    .map_err(|e| Error::InvalidHex(format!("{text:?}: {e}")))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Self)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uppercase hex pairs separated by single spaces (`04 1A 2B 3C`).
    ///
    /// This is what the operator sees and what is printed on the card.
    #[must_use]
    pub fn to_display_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Uppercase hex without separators (`041A2B3C`), as persisted.
    #[must_use]
    pub fn to_compact_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for UidBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}

impl From<Vec<u8>> for UidBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Placement and size of one text field on the card face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Horizontal offset from the card's left edge, in millimeters.
    pub x_mm: f64,

    /// Vertical offset from the card's top edge, in millimeters.
    pub y_mm: f64,

    /// Font size in typographic points.
    pub font_pt: u16,
}

impl FieldLayout {
    #[must_use]
    pub const fn new(x_mm: f64, y_mm: f64, font_pt: u16) -> Self {
        Self { x_mm, y_mm, font_pt }
    }

    /// Layout of the enrollment code field in the reference deployment.
    #[must_use]
    pub const fn default_primary() -> Self {
        let (x, y, pt) = DEFAULT_PRIMARY_FIELD;
        Self::new(x, y, pt)
    }

    /// Layout of the UID field in the reference deployment.
    #[must_use]
    pub const fn default_secondary() -> Self {
        let (x, y, pt) = DEFAULT_SECONDARY_FIELD;
        Self::new(x, y, pt)
    }
}

/// Physical size of the printable card area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(DEFAULT_CARD_WIDTH_MM, DEFAULT_CARD_HEIGHT_MM)
    }
}

/// Complete card face layout: frame size plus both text fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    #[serde(flatten)]
    pub surface: SurfaceSize,

    /// Enrollment code, drawn bold.
    pub primary: FieldLayout,

    /// Card UID, drawn at normal weight.
    pub secondary: FieldLayout,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            surface: SurfaceSize::default(),
            primary: FieldLayout::default_primary(),
            secondary: FieldLayout::default_secondary(),
        }
    }
}

impl CardLayout {
    /// Check that the frame is non-degenerate and the fields are placed
    /// at non-negative offsets with a usable font size.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if !(self.surface.width_mm > 0.0) {
            return Err(Error::invalid_value("card.width_mm", "must be positive"));
        }
        if !(self.surface.height_mm > 0.0) {
            return Err(Error::invalid_value("card.height_mm", "must be positive"));
        }
        let fields = [
            ("card.primary", &self.primary),
            ("card.secondary", &self.secondary),
        ];
        for (key, field) in fields {
            if !(field.x_mm >= 0.0 && field.y_mm >= 0.0) {
                return Err(Error::invalid_value(key, "offsets must be non-negative"));
            }
            if field.font_pt == 0 {
                return Err(Error::invalid_value(key, "font_pt must be at least 1"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x04, 0x1A, 0x2B, 0x3C], "04 1A 2B 3C", "041A2B3C")]
    #[case(&[0x04, 0xAB, 0xCD, 0xEF, 0x12, 0x34, 0x56], "04 AB CD EF 12 34 56", "04ABCDEF123456")]
    #[case(&[], "", "")]
    fn test_uid_hex_forms(#[case] bytes: &[u8], #[case] display: &str, #[case] compact: &str) {
        let uid = UidBytes::new(bytes);
        assert_eq!(uid.to_display_hex(), display);
        assert_eq!(uid.to_compact_hex(), compact);
        assert_eq!(uid.to_string(), display);
    }

    #[rstest]
    #[case("041A2B3C")]
    #[case("04 1A 2B 3C")]
    #[case("04 1a 2b 3c")]
    fn test_uid_from_hex(#[case] input: &str) {
        let uid = UidBytes::from_hex(input).unwrap();
        assert_eq!(uid.as_bytes(), &[0x04, 0x1A, 0x2B, 0x3C]);
    }

    #[rstest]
    #[case("041")] // odd digit count
    #[case("04 1G")] // non-hex digit
    fn test_uid_from_hex_invalid(#[case] input: &str) {
        assert!(matches!(UidBytes::from_hex(input), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_preference_list_lowercases_terms() {
        let prefs = PreferenceList::new(["OmniKey", " ACR "]).unwrap();
        assert_eq!(prefs.iter().collect::<Vec<_>>(), vec!["omnikey", "acr"]);
    }

    #[test]
    fn test_preference_list_rejects_empty_term() {
        let result = PreferenceList::new(["omnikey", "  "]);
        assert!(matches!(result, Err(Error::InvalidPreference(_))));
    }

    #[test]
    fn test_preference_list_keeps_fused_term() {
        let prefs = PreferenceList::default();
        assert_eq!(prefs.len(), 5);
        assert_eq!(prefs.iter().last(), Some("dualusbccidwudf"));
    }

    #[test]
    fn test_reader_name_matches_term_case_insensitive() {
        let reader = ReaderName::new("ACS ACR122U PICC Interface 0");
        assert!(reader.matches_term("acr"));
        assert!(reader.matches_term("picc interface"));
        assert!(!reader.matches_term("omnikey"));
    }

    #[test]
    fn test_card_layout_defaults() {
        let layout = CardLayout::default();
        assert_eq!(layout.surface, SurfaceSize::new(86.0, 54.0));
        assert_eq!(layout.primary, FieldLayout::new(10.0, 10.0, 18));
        assert_eq!(layout.secondary, FieldLayout::new(10.0, 30.0, 12));
        layout.validate().unwrap();
    }

    #[rstest]
    #[case(SurfaceSize::new(0.0, 54.0))]
    #[case(SurfaceSize::new(86.0, -1.0))]
    #[case(SurfaceSize::new(f64::NAN, 54.0))]
    fn test_card_layout_rejects_degenerate_surface(#[case] surface: SurfaceSize) {
        let layout = CardLayout {
            surface,
            ..CardLayout::default()
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_card_layout_rejects_zero_font() {
        let layout = CardLayout {
            secondary: FieldLayout::new(10.0, 30.0, 0),
            ..CardLayout::default()
        };
        assert!(layout.validate().is_err());
    }
}
