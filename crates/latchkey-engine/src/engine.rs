//! Authorization decision engine.
//!
//! Runs one card through the decision flow: cache lookup, remote check when
//! the cache cannot answer alone, and the resulting cache mutation. The
//! engine never touches the lock; it only returns an [`Outcome`].

use crate::clock::Clock;
use crate::decision::{CacheAction, Outcome, classify, resolve};
use crate::state_machine::{DecisionState, StateMachine};
use chrono::{DateTime, TimeDelta, Utc};
use latchkey_core::{CardId, DeviceConfig, DeviceIdentity, Result};
use latchkey_network::AuthorityClient;
use latchkey_storage::CardCache;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Two-tier authorization: local cache first, remote authority second.
///
/// # Examples
///
/// ```
/// use latchkey_core::{CardId, DeviceIdentity};
/// use latchkey_engine::{Decision, DecisionEngine, FixedClock};
/// use latchkey_network::{AccessCheck, MockAuthority};
/// use latchkey_storage::MemoryCardCache;
/// use chrono::TimeDelta;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> latchkey_core::Result<()> {
/// let mut engine = DecisionEngine::new(
///     DeviceIdentity::new("door-1")?,
///     TimeDelta::days(7),
///     MemoryCardCache::new(),
///     MockAuthority::new(AccessCheck::Authorized),
///     FixedClock::at_timestamp(1_700_000_000),
/// );
///
/// let outcome = engine.evaluate(&CardId::from_raw_code(0xa1b2)).await;
/// assert_eq!(outcome.decision, Decision::Grant);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DecisionEngine<C, A, K> {
    device: DeviceIdentity,
    ttl: TimeDelta,
    cache: C,
    authority: Arc<A>,
    clock: K,
    state: StateMachine,
}

impl<C, A, K> DecisionEngine<C, A, K>
where
    C: CardCache,
    A: AuthorityClient,
    K: Clock,
{
    pub fn new(device: DeviceIdentity, ttl: TimeDelta, cache: C, authority: A, clock: K) -> Self {
        Self {
            device,
            ttl,
            cache,
            authority: Arc::new(authority),
            clock,
            state: StateMachine::new(),
        }
    }

    /// Build an engine for the configured device and TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured device id is not a valid identity.
    pub fn from_config(config: &DeviceConfig, cache: C, authority: A, clock: K) -> Result<Self> {
        Ok(Self::new(
            config.device_identity()?,
            config.cache_ttl(),
            cache,
            authority,
            clock,
        ))
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Shared handle to the authority, for calls made outside the engine.
    pub fn authority(&self) -> &Arc<A> {
        &self.authority
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.state
    }

    /// Decide on one presented card.
    ///
    /// Never fails: an unreadable cache counts as a miss, an unanswered
    /// remote check counts as `Unreachable`, and a failed cache write is
    /// logged without changing the decision.
    pub async fn evaluate(&mut self, card: &CardId) -> Outcome {
        let now = self.clock.now();
        self.enter(DecisionState::Detected);

        let stored = self.cache.lookup(card).await;
        let status = classify(stored, now, self.ttl);
        self.enter(status.state());
        debug!(card_id = %card, state = %status.state(), "Cache consulted");

        let check = if status.needs_remote() {
            let check = self.authority.check_access(&self.device, card).await;
            debug!(card_id = %card, %check, "Remote authority answered");
            Some(check)
        } else {
            None
        };

        let outcome = resolve(status, check);
        self.apply(card, outcome.cache_action, now).await;

        self.enter(outcome.state());
        self.enter(DecisionState::Idle);

        info!(
            card_id = %card,
            decision = %outcome.decision,
            source = ?outcome.source,
            cache_action = ?outcome.cache_action,
            "Access decided"
        );
        outcome
    }

    async fn apply(&self, card: &CardId, action: CacheAction, now: DateTime<Utc>) {
        let result = match action {
            CacheAction::None => return,
            CacheAction::Insert => self.cache.insert(card, now).await,
            CacheAction::UpdateTimestamp => self.cache.refresh(card, now).await,
            CacheAction::Delete => self.cache.remove(card).await,
        };

        if let Err(e) = result {
            warn!(card_id = %card, action = ?action, error = %e, "Cache update failed");
        }
    }

    /// Step the state machine. An invalid step means an earlier evaluation
    /// was abandoned midway, so the machine is reset and the step retried.
    fn enter(&mut self, state: DecisionState) {
        if let Err(e) = self.state.transition_to(state) {
            warn!(error = %e, "Resetting decision state machine");
            self.state.reset();
            if state != DecisionState::Idle
                && let Err(e) = self.state.transition_to(state)
            {
                warn!(error = %e, "Decision state machine out of step");
            }
        }
    }
}
