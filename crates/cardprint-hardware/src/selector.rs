//! Heuristic choice among several attached readers.
//!
//! Preference terms are tried in priority order; for each term every reader
//! name is checked for a case-insensitive substring match, and the first hit
//! wins. When no term matches anything the first enumerated reader is used.
//!
//! Terms are matched literally. A misconfigured term that runs two names
//! together (`"dualusbccid"`) simply never matches a reader called
//! "Dual Interface" or "USB CCID"; it is not split or repaired here.

use cardprint_core::{PreferenceList, ReaderName};

/// A reader choice together with the reason it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'r, 'p> {
    /// Chosen reader.
    pub reader: &'r ReaderName,

    /// Preference term that matched, or `None` for the first-reader fallback.
    pub matched_term: Option<&'p str>,
}

/// Choose a reader, reporting which preference term (if any) matched.
///
/// Returns `None` only when `available` is empty.
pub fn select<'r, 'p>(
    available: &'r [ReaderName],
    preferences: &'p PreferenceList,
) -> Option<Selection<'r, 'p>> {
    preferences
        .iter()
        .find_map(|term| {
            available
                .iter()
                .find(|reader| reader.matches_term(term))
                .map(|reader| Selection {
                    reader,
                    matched_term: Some(term),
                })
        })
        .or_else(|| {
            available.first().map(|reader| Selection {
                reader,
                matched_term: None,
            })
        })
}

/// Choose a reader from `available`.
///
/// Returns `None` only when `available` is empty.
///
/// # Examples
///
/// ```
/// use cardprint_core::{PreferenceList, ReaderName};
/// use cardprint_hardware::selector::select_reader;
///
/// let readers = vec![ReaderName::new("ACR122 USB"), ReaderName::new("Generic Reader")];
/// let prefs = PreferenceList::new(["omnikey", "acr"]).unwrap();
///
/// assert_eq!(select_reader(&readers, &prefs).unwrap().as_str(), "ACR122 USB");
/// ```
pub fn select_reader<'r>(
    available: &'r [ReaderName],
    preferences: &PreferenceList,
) -> Option<&'r ReaderName> {
    select(available, preferences).map(|selection| selection.reader)
}
