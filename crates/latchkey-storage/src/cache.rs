#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::record::CardRecord;
use chrono::{DateTime, Utc};
use latchkey_core::CardId;

/// Contract for the durable store of verified cards.
///
/// The cache is the single writer of card records. It holds at most one
/// record per card and never moves a stored timestamp backward.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate.
pub trait CardCache: Send + Sync {
    /// Timestamp of the card's last verification, if cached.
    ///
    /// A store that cannot be read is reported as `None`.
    async fn lookup(&self, card_id: &CardId) -> Option<DateTime<Utc>>;

    /// Add a record for a card that is not yet cached
    async fn insert(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()>;

    /// Move an existing record's timestamp forward to `now`.
    ///
    /// A stored timestamp later than `now` is kept. Refreshing a card that is
    /// not cached does nothing.
    async fn refresh(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()>;

    /// Delete the card's record. Removing an absent card does nothing.
    async fn remove(&self, card_id: &CardId) -> StorageResult<()>;

    /// All well-formed records currently stored
    async fn records(&self) -> StorageResult<Vec<CardRecord>>;

    /// Number of well-formed records
    async fn len(&self) -> StorageResult<usize> {
        Ok(self.records().await?.len())
    }

    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }
}
