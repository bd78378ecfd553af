use crate::cache::CardCache;
use crate::error::StorageResult;
use crate::record::{CardRecord, truncate_to_seconds};
use chrono::{DateTime, Utc};
use latchkey_core::CardId;
use std::ffi::OsString;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Card cache backed by a newline-delimited text file.
///
/// Inserts append one line. Refresh and remove read the whole file, build
/// the new contents in memory and replace the file in one step: the new
/// contents go to `<path>.tmp`, are synced to disk, then renamed over the
/// store. A power cut leaves either the old or the new file.
///
/// The store is handled as raw bytes. A line that is not valid UTF-8 is
/// skipped on lookup and copied through untouched on rewrite, so one torn
/// line never hides the other records.
#[derive(Debug, Clone)]
pub struct FileCardCache {
    path: PathBuf,
}

impl FileCardCache {
    /// Create a cache over the file at `path`. The file is created on the
    /// first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the whole store. A missing file is `None`.
    async fn read_contents(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_contents(&self, contents: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();

        let mut file = fs::File::create(&temp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// Rewrite the store, passing each well-formed record through `edit`.
    ///
    /// `edit` returns the replacement line or `None` to drop the record.
    /// Lines of untouched records and malformed lines are copied verbatim.
    /// Nothing is written when no record matched.
    async fn rewrite<F>(&self, card_id: &CardId, mut edit: F) -> StorageResult<bool>
    where
        F: FnMut(CardRecord) -> Option<String>,
    {
        let Some(contents) = self.read_contents().await? else {
            return Ok(false);
        };

        let mut matched = false;
        let mut output = Vec::with_capacity(contents.len());

        for line in lines(&contents) {
            match CardRecord::parse_bytes(line) {
                Some(record) if record.card_id == *card_id => {
                    matched = true;
                    if let Some(replacement) = edit(record) {
                        output.extend_from_slice(replacement.as_bytes());
                        output.push(b'\n');
                    }
                }
                _ => {
                    if !line.trim_ascii().is_empty() {
                        output.extend_from_slice(line);
                        output.push(b'\n');
                    }
                }
            }
        }

        if matched {
            self.replace_contents(&output).await?;
        }

        Ok(matched)
    }
}

/// Split the store into lines without decoding it.
fn lines(contents: &[u8]) -> impl Iterator<Item = &[u8]> {
    contents.split(|&b| b == b'\n')
}

impl CardCache for FileCardCache {
    async fn lookup(&self, card_id: &CardId) -> Option<DateTime<Utc>> {
        let contents = match self.read_contents().await {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Card cache unreadable, treating as miss");
                return None;
            }
        };

        lines(&contents)
            .filter_map(CardRecord::parse_bytes)
            .find(|record| record.card_id == *card_id)
            .map(|record| record.last_verified_at)
    }

    async fn insert(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        // Only the last byte matters: an unterminated tail gets its newline
        let mut line = String::new();
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                line.push('\n');
            }
        }
        line.push_str(&CardRecord::new(card_id.clone(), now).to_line());
        line.push('\n');

        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;

        debug!(card_id = %card_id, "Card cached");
        Ok(())
    }

    async fn refresh(&self, card_id: &CardId, now: DateTime<Utc>) -> StorageResult<()> {
        let now = truncate_to_seconds(now);
        let matched = self
            .rewrite(card_id, |record| {
                let newest = record.last_verified_at.max(now);
                Some(CardRecord::new(record.card_id, newest).to_line())
            })
            .await?;

        if matched {
            debug!(card_id = %card_id, "Card cache entry refreshed");
        } else {
            debug!(card_id = %card_id, "Refresh skipped, card not cached");
        }
        Ok(())
    }

    async fn remove(&self, card_id: &CardId) -> StorageResult<()> {
        let matched = self.rewrite(card_id, |_| None).await?;

        if matched {
            debug!(card_id = %card_id, "Card removed from cache");
        }
        Ok(())
    }

    async fn records(&self) -> StorageResult<Vec<CardRecord>> {
        let contents = self.read_contents().await?.unwrap_or_default();
        Ok(lines(&contents).filter_map(CardRecord::parse_bytes).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[test]
    fn test_temp_path() {
        let cache = FileCardCache::new("/data/cards.txt");
        assert_eq!(cache.temp_path(), PathBuf::from("/data/cards.txt.tmp"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = FileCardCache::new(dir.path().join("cards.txt"));

        assert!(cache.lookup(&card("01a1b2")).await.is_none());
        assert!(cache.records().await.unwrap().is_empty());
        cache.refresh(&card("01a1b2"), at(10)).await.unwrap();
        cache.remove(&card("01a1b2")).await.unwrap();
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn test_unreadable_store_is_miss() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the file cannot be read
        let cache = FileCardCache::new(dir.path());
        assert!(cache.lookup(&card("01a1b2")).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let cache = FileCardCache::new(dir.path().join("state").join("cards.txt"));

        cache.insert(&card("01a1b2"), at(1_000)).await.unwrap();

        let contents = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(contents, "01a1b2,1000\n");
    }

    #[tokio::test]
    async fn test_insert_after_unterminated_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.txt");
        std::fs::write(&path, "01ffee,5").unwrap();
        let cache = FileCardCache::new(&path);

        cache.insert(&card("01a1b2"), at(7)).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "01ffee,5\n01a1b2,7\n");
    }

    #[tokio::test]
    async fn test_refresh_copies_other_lines_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.txt");
        std::fs::write(&path, "01ffee,5\nnot a record\n01a1b2,100\n").unwrap();
        let cache = FileCardCache::new(&path);

        cache.refresh(&card("01a1b2"), at(500)).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "01ffee,5\nnot a record\n01a1b2,500\n"
        );
        assert!(!cache.temp_path().exists());
    }

    #[tokio::test]
    async fn test_refresh_never_moves_backward() {
        let dir = TempDir::new().unwrap();
        let cache = FileCardCache::new(dir.path().join("cards.txt"));
        cache.insert(&card("01a1b2"), at(900)).await.unwrap();

        cache.refresh(&card("01a1b2"), at(100)).await.unwrap();

        assert_eq!(cache.lookup(&card("01a1b2")).await, Some(at(900)));
    }

    #[tokio::test]
    async fn test_remove_drops_every_matching_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.txt");
        std::fs::write(&path, "01a1b2,1\n01ffee,2\n01a1b2,3\n").unwrap();
        let cache = FileCardCache::new(&path);

        cache.remove(&card("01a1b2")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "01ffee,2\n");
    }

    #[tokio::test]
    async fn test_torn_line_does_not_disable_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.txt");
        std::fs::write(&path, b"01a1b2,1760832000\n01ff\xff\xfe\x80garbage\n").unwrap();
        let cache = FileCardCache::new(&path);

        assert_eq!(cache.lookup(&card("01a1b2")).await, Some(at(1_760_832_000)));
        assert_eq!(cache.records().await.unwrap().len(), 1);

        cache.insert(&card("01ffee"), at(1_760_900_000)).await.unwrap();
        assert_eq!(cache.lookup(&card("01ffee")).await, Some(at(1_760_900_000)));

        cache.refresh(&card("01a1b2"), at(1_761_000_000)).await.unwrap();
        assert_eq!(cache.lookup(&card("01a1b2")).await, Some(at(1_761_000_000)));

        cache.remove(&card("01ffee")).await.unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"01a1b2,1761000000\n01ff\xff\xfe\x80garbage\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_remove_absent_card_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.txt");
        std::fs::write(&path, "01ffee,2\r\n").unwrap();
        let cache = FileCardCache::new(&path);

        cache.remove(&card("01a1b2")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "01ffee,2\r\n");
    }
}
