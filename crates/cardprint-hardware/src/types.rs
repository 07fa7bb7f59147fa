//! Values produced by card acquisition.

use cardprint_core::{ReaderName, UidBytes};
use chrono::{DateTime, Utc};

/// Outcome of waiting for a card on a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// A card is in the reader's field.
    Present,

    /// The wait expired with no card in the field.
    Absent,
}

/// A UID successfully read from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredCard {
    /// Card UID, status word removed.
    pub uid: UidBytes,

    /// Reader the card was read on.
    pub reader: ReaderName,

    /// When the UID was read.
    pub acquired_at: DateTime<Utc>,
}

impl AcquiredCard {
    /// Create a new acquired card stamped with the current time.
    pub fn new(uid: UidBytes, reader: ReaderName) -> Self {
        Self {
            uid,
            reader,
            acquired_at: Utc::now(),
        }
    }

    /// Set a custom acquisition time, for replaying or testing.
    pub fn with_timestamp(mut self, acquired_at: DateTime<Utc>) -> Self {
        self.acquired_at = acquired_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_acquired_card_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let card = AcquiredCard::new(UidBytes::new([0x04, 0x1A]), ReaderName::new("ACR122U"))
            .with_timestamp(at);

        assert_eq!(card.acquired_at, at);
        assert_eq!(card.uid.to_compact_hex(), "041A");
        assert_eq!(card.reader.as_str(), "ACR122U");
    }
}
