use crate::{
    Result,
    constants::{CARD_ID_PREFIX, MAX_CARD_ID_LENGTH, MAX_DEVICE_ID_LENGTH, RECORD_DELIMITER},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Characters that cannot appear in an identifier.
///
/// `,` would break the cache line format and `/` the authority URL path.
const FORBIDDEN_ID_CHARS: [char; 2] = [RECORD_DELIMITER, '/'];

fn check_identifier(value: &str, max_len: usize) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }

    let len = value.len();
    if len > max_len {
        return Err(format!("must be at most {max_len} chars, got {len}"));
    }

    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return Err(format!("'{value}' must be printable ASCII without spaces"));
    }

    if let Some(c) = value.chars().find(|c| FORBIDDEN_ID_CHARS.contains(c)) {
        return Err(format!("'{value}' must not contain '{c}'"));
    }

    Ok(())
}

/// Card identifier as stored in the cache and sent to the remote authority.
///
/// Derived from the reader's raw code as the fixed prefix `01` followed by
/// the lowercase hexadecimal code. The engine never parses it further.
///
/// # Security
/// Comparison runs in constant time so a lookup does not leak how much of a
/// stored identifier matched.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Create a card identifier from an already-formed string.
    ///
    /// Surrounding whitespace is trimmed. Case is preserved.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` if the identifier is empty, too long,
    /// contains whitespace or non-ASCII characters, or contains `,` or `/`.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        check_identifier(id, MAX_CARD_ID_LENGTH).map_err(Error::InvalidCardId)?;
        Ok(CardId(id.to_string()))
    }

    /// Build the identifier for a raw code reported by the reader.
    ///
    /// ```
    /// use latchkey_core::CardId;
    ///
    /// assert_eq!(CardId::from_raw_code(0x00ffee).as_str(), "01ffee");
    /// assert_eq!(CardId::from_raw_code(0).as_str(), "010");
    /// ```
    #[must_use]
    pub fn from_raw_code(code: u32) -> Self {
        CardId(format!("{CARD_ID_PREFIX}{code:x}"))
    }

    /// Get the card identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s)
    }
}

impl TryFrom<String> for CardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardId::new(&value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Identity of this door controller as known by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Create a device identity with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` under the same rules as [`CardId::new`].
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        check_identifier(id, MAX_DEVICE_ID_LENGTH).map_err(Error::InvalidDeviceId)?;
        Ok(DeviceIdentity(id.to_string()))
    }

    /// Get the device identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeviceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceIdentity::new(s)
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceIdentity::new(&value)
    }
}

impl From<DeviceIdentity> for String {
    fn from(id: DeviceIdentity) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0xa1b2, "01a1b2")]
    #[case(0x00ffee, "01ffee")]
    #[case(0xdeadbeef, "01deadbeef")]
    #[case(7, "017")]
    fn test_card_id_from_raw_code(#[case] code: u32, #[case] expected: &str) {
        assert_eq!(CardId::from_raw_code(code).as_str(), expected);
    }

    #[rstest]
    #[case("01A1B2", "01A1B2")]
    #[case("  01ffee \n", "01ffee")]
    fn test_card_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id = CardId::new(input).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("01a1,b2")]
    #[case("01a1/b2")]
    #[case("01 a1")]
    #[case("01çç")]
    fn test_card_id_invalid(#[case] input: &str) {
        assert!(matches!(CardId::new(input), Err(Error::InvalidCardId(_))));
    }

    #[test]
    fn test_card_id_too_long() {
        let long = "0".repeat(MAX_CARD_ID_LENGTH + 1);
        assert!(CardId::new(&long).is_err());
    }

    #[test]
    fn test_card_id_case_is_significant() {
        let upper = CardId::new("01A1B2").unwrap();
        let lower = CardId::new("01a1b2").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_card_id_serde() {
        let id = CardId::new("01a1b2").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"01a1b2\"");

        let bad: std::result::Result<CardId, _> = serde_json::from_str("\"a,b\"");
        assert!(bad.is_err());
    }

    #[rstest]
    #[case("door-7")]
    #[case("ESP32_LAB")]
    fn test_device_identity_valid(#[case] input: &str) {
        let id: DeviceIdentity = input.parse().unwrap();
        assert_eq!(id.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("lab/door")]
    #[case("lab door")]
    fn test_device_identity_invalid(#[case] input: &str) {
        assert!(matches!(
            DeviceIdentity::new(input),
            Err(Error::InvalidDeviceId(_))
        ));
    }
}
