use crate::cache::CardCache;
use crate::error::{StorageError, StorageResult};
use crate::record::{CardRecord, truncate_to_seconds};
use chrono::{DateTime, Utc};
use latchkey_core::CardId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory card cache for tests and dry runs.
///
/// Can be switched to "unavailable" to exercise the store-failure paths:
/// lookups then miss and mutations fail.
#[derive(Debug, Default)]
pub struct MemoryCardCache {
    records: RwLock<HashMap<CardId, DateTime<Utc>>>,
    unavailable: AtomicBool,
}

impl MemoryCardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-loaded with records
    pub fn with_records(records: impl IntoIterator<Item = CardRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.card_id, r.last_verified_at))
            .collect();
        Self {
            records: RwLock::new(records),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory cache disabled".to_string()));
        }
        Ok(())
    }
}

impl CardCache for MemoryCardCache {
    async fn lookup(&self, card_id: &CardId) -> Option<DateTime<Utc>> {
        if self.check_available().is_err() {
            return None;
        }
        self.records.read().await.get(card_id).copied()
    }

    async fn insert(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()> {
        self.check_available()?;
        self.records
            .write()
            .await
            .insert(card_id.clone(), truncate_to_seconds(now));
        Ok(())
    }

    async fn refresh(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()> {
        self.check_available()?;
        let now = truncate_to_seconds(now);
        if let Some(stored) = self.records.write().await.get_mut(card_id) {
            *stored = (*stored).max(now);
        }
        Ok(())
    }

    async fn remove(&self, card_id: &CardId) -> StorageResult<()> {
        self.check_available()?;
        self.records.write().await.remove(card_id);
        Ok(())
    }

    async fn records(&self) -> StorageResult<Vec<CardRecord>> {
        self.check_available()?;
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .iter()
            .map(|(id, ts)| CardRecord::new(id.clone(), *ts))
            .collect();
        records.sort_by(|a, b| a.card_id.as_str().cmp(b.card_id.as_str()));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let id = CardId::new("01a1b2").unwrap();
        let cache = MemoryCardCache::with_records([CardRecord::new(id.clone(), at(5))]);
        cache.set_unavailable(true);

        assert!(cache.lookup(&id).await.is_none());
        assert!(matches!(
            cache.insert(&id, at(10)).await,
            Err(StorageError::Unavailable(_))
        ));

        cache.set_unavailable(false);
        assert_eq!(cache.lookup(&id).await, Some(at(5)));
    }

    #[tokio::test]
    async fn test_refresh_absent_is_noop() {
        let cache = MemoryCardCache::new();
        cache
            .refresh(&CardId::new("017").unwrap(), at(10))
            .await
            .unwrap();
        assert!(cache.is_empty().await.unwrap());
    }
}
