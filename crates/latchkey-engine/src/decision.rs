//! Pure decision logic.
//!
//! [`classify`] turns the cache lookup into a [`CacheStatus`]; [`resolve`]
//! turns that status plus the remote answer into an [`Outcome`]. Neither
//! does I/O, so every branch of the decision table is tested directly:
//!
//! | Cache  | Remote          | Decision | Cache action      |
//! |--------|-----------------|----------|-------------------|
//! | fresh  | (not asked)     | Grant    | None              |
//! | stale  | Authorized      | Grant    | UpdateTimestamp   |
//! | stale  | NotAuthorized   | Deny     | Delete            |
//! | stale  | Unreachable     | Deny     | None              |
//! | miss   | Authorized      | Grant    | Insert            |
//! | miss   | NotAuthorized   | Deny     | None              |
//! | miss   | Unreachable     | Deny     | None              |

use crate::state_machine::DecisionState;
use chrono::{DateTime, TimeDelta, Utc};
use latchkey_network::AccessCheck;
use std::fmt;

/// Whether the door opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Grant,
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Decision::Grant => f.write_str("grant"),
            Decision::Deny => f.write_str("deny"),
        }
    }
}

/// Mutation of the card cache that follows a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheAction {
    None,
    Insert,
    UpdateTimestamp,
    Delete,
}

/// Which tier produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionSource {
    LocalCache,
    RemoteAuthority,
}

/// Result of evaluating one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub decision: Decision,
    pub cache_action: CacheAction,
    pub source: DecisionSource,
}

impl Outcome {
    pub fn is_granted(&self) -> bool {
        self.decision == Decision::Grant
    }

    /// Terminal state of the evaluation.
    pub fn state(&self) -> DecisionState {
        match self.decision {
            Decision::Grant => DecisionState::Granted,
            Decision::Deny => DecisionState::Denied,
        }
    }
}

/// What the cache knows about a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Miss,
    Fresh { verified_at: DateTime<Utc> },
    Stale { verified_at: DateTime<Utc> },
}

impl CacheStatus {
    /// Whether the remote authority must be asked.
    pub fn needs_remote(&self) -> bool {
        !matches!(self, CacheStatus::Fresh { .. })
    }

    /// State entered after the lookup.
    pub fn state(&self) -> DecisionState {
        match self {
            CacheStatus::Miss => DecisionState::CacheMiss,
            CacheStatus::Fresh { .. } => DecisionState::CacheHitFresh,
            CacheStatus::Stale { .. } => DecisionState::CacheHitStale,
        }
    }
}

/// Classify a cache lookup.
///
/// A record is fresh while its age is at most `ttl`. A negative age (stored
/// time ahead of the clock) counts as fresh.
///
/// ```
/// use chrono::{DateTime, TimeDelta};
/// use latchkey_engine::{CacheStatus, classify};
///
/// let stored = DateTime::from_timestamp(0, 0).unwrap();
/// let ttl = TimeDelta::days(7);
///
/// assert!(matches!(classify(Some(stored), stored + ttl, ttl), CacheStatus::Fresh { .. }));
/// assert!(matches!(
///     classify(Some(stored), stored + ttl + TimeDelta::seconds(1), ttl),
///     CacheStatus::Stale { .. }
/// ));
/// ```
pub fn classify(
    stored: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    ttl: TimeDelta,
) -> CacheStatus {
    match stored {
        None => CacheStatus::Miss,
        Some(verified_at) if now - verified_at <= ttl => CacheStatus::Fresh { verified_at },
        Some(verified_at) => CacheStatus::Stale { verified_at },
    }
}

/// Decide from the cache status and the remote answer.
///
/// `check` is ignored for a fresh hit. A missing answer where one was
/// needed is treated as `Unreachable`.
pub fn resolve(status: CacheStatus, check: Option<AccessCheck>) -> Outcome {
    let check = check.unwrap_or(AccessCheck::Unreachable);

    let (decision, cache_action, source) = match (status, check) {
        (CacheStatus::Fresh { .. }, _) => {
            (Decision::Grant, CacheAction::None, DecisionSource::LocalCache)
        }
        (CacheStatus::Stale { .. }, AccessCheck::Authorized) => (
            Decision::Grant,
            CacheAction::UpdateTimestamp,
            DecisionSource::RemoteAuthority,
        ),
        (CacheStatus::Stale { .. }, AccessCheck::NotAuthorized) => {
            (Decision::Deny, CacheAction::Delete, DecisionSource::RemoteAuthority)
        }
        (CacheStatus::Miss, AccessCheck::Authorized) => {
            (Decision::Grant, CacheAction::Insert, DecisionSource::RemoteAuthority)
        }
        (CacheStatus::Miss, AccessCheck::NotAuthorized)
        | (CacheStatus::Miss | CacheStatus::Stale { .. }, AccessCheck::Unreachable) => {
            (Decision::Deny, CacheAction::None, DecisionSource::RemoteAuthority)
        }
    };

    Outcome {
        decision,
        cache_action,
        source,
    }
}
