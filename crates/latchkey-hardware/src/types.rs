//! Common types shared across device implementations.

use chrono::{DateTime, Utc};
use latchkey_core::CardId;
use std::fmt;

/// Generic device information, used in start-up logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device name (e.g., "RDM6300", "Mock Reader").
    pub name: String,

    /// Device model or transport description.
    pub model: String,
}

impl DeviceInfo {
    /// Create a new DeviceInfo.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// Status indicator colors.
///
/// The door panel uses four of them: yellow once at start-up, blue while
/// waiting for a card, green on grant, red on deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LedColor::Red => "red",
            LedColor::Green => "green",
            LedColor::Blue => "blue",
            LedColor::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// Physical state of the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Door held shut
    Engaged,
    /// Door can be opened
    Released,
}

/// One card presentation reported by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRead {
    /// Raw code of the tag
    pub code: u32,

    /// When the reader reported the card
    pub read_at: DateTime<Utc>,
}

impl CardRead {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            read_at: Utc::now(),
        }
    }

    /// Card identifier derived from the raw code
    pub fn card_id(&self) -> CardId {
        CardId::from_raw_code(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_read_id() {
        assert_eq!(CardRead::new(0xa1b2).card_id().as_str(), "01a1b2");
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::new("RDM6300", "/dev/ttyUSB0 @ 9600");
        assert_eq!(info.to_string(), "RDM6300 (/dev/ttyUSB0 @ 9600)");
    }
}
