//! Card record and its line encoding.
//!
//! The store is newline-delimited text, one record per line:
//!
//! ```text
//! 01a1b2,1760832000
//! 01ffee,1760745600
//! ```
//!
//! There is no header, checksum or ordering. A line without the `,`
//! delimiter is skipped. A timestamp that does not parse as an integer is
//! read as the Unix epoch, which makes the record stale.

use chrono::{DateTime, Utc};
use latchkey_core::{CardId, constants::RECORD_DELIMITER};

/// A previously verified card and the time of its last successful
/// verification, in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub card_id: CardId,
    pub last_verified_at: DateTime<Utc>,
}

impl CardRecord {
    pub fn new(card_id: CardId, last_verified_at: DateTime<Utc>) -> Self {
        Self {
            card_id,
            last_verified_at: truncate_to_seconds(last_verified_at),
        }
    }

    /// Decode one line of the store.
    ///
    /// Returns `None` for blank lines, lines without a delimiter and lines
    /// whose identifier part is not a valid [`CardId`].
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let (id, timestamp) = line.split_once(RECORD_DELIMITER)?;
        let card_id = CardId::new(id).ok()?;

        Some(Self {
            card_id,
            last_verified_at: parse_timestamp(timestamp),
        })
    }

    /// Decode one raw line of the store. A line that is not valid UTF-8, such
    /// as the tail of a torn write, is treated like any other malformed line.
    pub fn parse_bytes(line: &[u8]) -> Option<Self> {
        std::str::from_utf8(line).ok().and_then(Self::parse_line)
    }

    /// Encode as a store line without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}",
            self.card_id,
            RECORD_DELIMITER,
            self.last_verified_at.timestamp()
        )
    }

    /// Age of the record at `now`. Negative when the stored time is ahead of
    /// the clock.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::TimeDelta {
        now - self.last_verified_at
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Drop sub-second precision; the store only keeps whole seconds.
pub(crate) fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}
