//! # Latchkey Storage
//!
//! Durable cache of previously verified cards.
//!
//! The cache maps a [`CardId`](latchkey_core::CardId) to the time of its last
//! successful remote verification. The decision engine trusts a cached entry
//! for the configured TTL and re-verifies it with the remote authority once
//! it is older.
//!
//! ## Components
//!
//! - [`CardCache`] - store contract used by the engine
//! - [`FileCardCache`] - newline-delimited `card_id,timestamp` file
//! - [`MemoryCardCache`] - in-memory store for tests and dry runs
//! - [`CardRecord`] - one cached card and its line encoding
//!
//! ## Failure Model
//!
//! A store that cannot be read behaves as empty for lookups, so a broken
//! cache degrades to "always ask the remote authority". Mutations report a
//! [`StorageError`] and the caller decides whether to continue.
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use latchkey_core::CardId;
//! use latchkey_storage::{CardCache, FileCardCache};
//!
//! # async fn example() -> latchkey_storage::StorageResult<()> {
//! let cache = FileCardCache::new("cards.txt");
//! let card = CardId::from_raw_code(0xa1b2);
//!
//! if cache.lookup(&card).await.is_none() {
//!     cache.insert(&card, Utc::now()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod file;
pub mod memory;
pub mod record;

pub use cache::CardCache;
pub use error::{StorageError, StorageResult};
pub use file::FileCardCache;
pub use memory::MemoryCardCache;
pub use record::CardRecord;
