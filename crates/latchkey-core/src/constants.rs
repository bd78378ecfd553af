//! Core constants for the Latchkey door controller.
//!
//! These values define the card identifier encoding, the on-disk cache
//! format and the defaults used when a configuration key is absent.
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//!
//! assert_eq!(CARD_ID_PREFIX, "01");
//! assert_eq!(DEFAULT_CACHE_TTL_SECS, 7 * 24 * 60 * 60);
//! ```

// ============================================================================
// Card Identifiers
// ============================================================================

/// Fixed prefix prepended to the hexadecimal reader code.
///
/// ```
/// use latchkey_core::CardId;
///
/// let id = CardId::from_raw_code(0xa1b2);
/// assert_eq!(id.as_str(), "01a1b2");
/// ```
pub const CARD_ID_PREFIX: &str = "01";

/// Maximum accepted length of a card identifier string.
pub const MAX_CARD_ID_LENGTH: usize = 64;

/// Maximum accepted length of a device identity string.
pub const MAX_DEVICE_ID_LENGTH: usize = 64;

// ============================================================================
// Cache File Format
// ============================================================================

/// Separator between card identifier and timestamp in a cache line.
///
/// ```text
/// 01a1b2,1760832000
///       ^
/// ```
pub const RECORD_DELIMITER: char = ',';

/// Default location of the card cache file.
pub const DEFAULT_CACHE_PATH: &str = "cards.txt";

// ============================================================================
// Timing
// ============================================================================

/// Default trust window for a cached verification (7 days).
///
/// A cached card whose age is less than or equal to this value is granted
/// without contacting the remote authority.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default time the lock stays released after a grant.
pub const DEFAULT_UNLOCK_SECS: u64 = 5;

/// Default timeout for a remote authority round-trip.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default interval between reader polls while idle.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// ============================================================================
// Remote Authority
// ============================================================================

/// Default base URL of the access check endpoint.
///
/// The request path is `{base}/{device_id}/{card_id}`.
pub const DEFAULT_AUTHORITY_URL: &str = "https://lab.cafe/otello/admin/api/check_access";

/// Value of the `response` field that means "authorized".
pub const AUTHORIZED_RESPONSE: i64 = 1;

// ============================================================================
// Configuration Sources
// ============================================================================

/// Base name of the optional configuration file (any supported extension).
pub const DEFAULT_CONFIG_NAME: &str = "latchkey";

/// File written by the `provision` command.
pub const DEFAULT_CONFIG_FILE: &str = "latchkey.json";

/// Prefix for environment variable overrides (`LATCHKEY_DEVICE_ID`, ...).
pub const ENV_PREFIX: &str = "LATCHKEY";
