//! UID command and response handling.
//!
//! The only exchange with the card is the reader pseudo-APDU
//! `FF CA 00 00 00`. Its response is `UID || SW1 || SW2`.

use crate::error::TransmitFailure;
use cardprint_core::UidBytes;
use cardprint_core::constants::{MAX_UID_LENGTH, MIN_UID_LENGTH, STATUS_WORD_LEN, SW_SUCCESS};
use std::fmt;

pub use cardprint_core::constants::GET_UID_APDU;

/// Status word (SW1 SW2) trailing an APDU response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    pub fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Combined status word.
    pub fn as_u16(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// `90 00`.
    pub fn is_success(&self) -> bool {
        self.as_u16() == SW_SUCCESS
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Split a response into its data bytes and trailing status word.
///
/// Returns `None` if the response is shorter than a status word.
pub fn split_status_word(response: &[u8]) -> Option<(&[u8], StatusWord)> {
    let data_len = response.len().checked_sub(STATUS_WORD_LEN)?;
    let (data, sw) = response.split_at(data_len);
    Some((data, StatusWord::new(sw[0], sw[1])))
}

/// Extract the UID from a Get UID response.
///
/// The trailing status word is stripped and everything before it is the
/// UID. The status word itself does not decide success: readers that
/// prefix a UID to a non-`90 00` status still yield that UID. A response
/// with no bytes before the status word is rejected, since there is nothing
/// to identify the card by.
///
/// # Errors
///
/// - [`TransmitFailure::ShortResponse`] if fewer than 2 bytes came back.
/// - [`TransmitFailure::EmptyUid`] if only a status word came back.
///
/// # Examples
///
/// ```
/// use cardprint_hardware::apdu::parse_uid_response;
///
/// let uid = parse_uid_response(&[0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]).unwrap();
/// assert_eq!(uid.to_display_hex(), "04 1A 2B 3C");
/// assert_eq!(uid.to_compact_hex(), "041A2B3C");
///
/// assert!(parse_uid_response(&[0x90, 0x00]).is_err());
/// ```
pub fn parse_uid_response(response: &[u8]) -> Result<UidBytes, TransmitFailure> {
    let (data, sw) = split_status_word(response).ok_or(TransmitFailure::ShortResponse {
        len: response.len(),
    })?;

    if data.is_empty() {
        return Err(TransmitFailure::EmptyUid { sw: sw.as_u16() });
    }

    if !sw.is_success() {
        tracing::warn!(status = %sw, "UID response carried a non-success status word");
    }
    if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&data.len()) {
        tracing::debug!(len = data.len(), "unusual UID length");
    }

    Ok(UidBytes::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_four_byte_uid() {
        let uid = parse_uid_response(&[0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]).unwrap();
        assert_eq!(uid.as_bytes(), &[0x04, 0x1A, 0x2B, 0x3C]);
        assert_eq!(uid.to_display_hex(), "04 1A 2B 3C");
        assert_eq!(uid.to_compact_hex(), "041A2B3C");
    }

    #[test]
    fn test_parse_seven_byte_uid() {
        let response = [0x04, 0x52, 0x7A, 0x12, 0xB3, 0x5C, 0x80, 0x90, 0x00];
        let uid = parse_uid_response(&response).unwrap();
        assert_eq!(uid.len(), 7);
        assert_eq!(uid.to_compact_hex(), "04527A12B35C80");
    }

    #[test]
    fn test_status_only_response_is_empty_uid() {
        let result = parse_uid_response(&[0x90, 0x00]);
        assert_eq!(result, Err(TransmitFailure::EmptyUid { sw: 0x9000 }));
    }

    #[test]
    fn test_error_status_only_response() {
        // Reader firmware reporting "function not supported"
        let result = parse_uid_response(&[0x6A, 0x81]);
        assert_eq!(result, Err(TransmitFailure::EmptyUid { sw: 0x6A81 }));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x90])]
    fn test_short_response(#[case] response: &[u8]) {
        let result = parse_uid_response(response);
        assert_eq!(
            result,
            Err(TransmitFailure::ShortResponse {
                len: response.len()
            })
        );
    }

    #[test]
    fn test_uid_with_warning_status_is_accepted() {
        let uid = parse_uid_response(&[0x11, 0x22, 0x33, 0x44, 0x62, 0x82]).unwrap();
        assert_eq!(uid.to_compact_hex(), "11223344");
    }

    #[test]
    fn test_split_status_word() {
        let (data, sw) = split_status_word(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(data, &[0x01, 0x02]);
        assert!(sw.is_success());
        assert_eq!(sw.to_string(), "90 00");
        assert!(split_status_word(&[0x90]).is_none());
    }
}
