//! Mock lock that records every actuation.

use crate::{HardwareError, Result, traits::LockDevice, types::LockState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

#[derive(Debug, Default)]
struct LockLog {
    events: Mutex<Vec<(LockState, Instant)>>,
    failing: AtomicBool,
}

/// Mock lock for tests.
///
/// Clones share the same history, so a test keeps one clone and hands the
/// other to the door panel. Timestamps come from `tokio::time::Instant` so
/// they follow paused test time.
#[derive(Debug, Clone, Default)]
pub struct MockLock {
    log: Arc<LockLog>,
}

impl MockLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every actuation fail, to simulate a broken relay
    pub fn set_failing(&self, failing: bool) {
        self.log.failing.store(failing, Ordering::SeqCst);
    }

    /// All actuations so far, oldest first
    pub fn history(&self) -> Vec<(LockState, Instant)> {
        self.events().clone()
    }

    /// Current state; engaged before the first actuation
    pub fn state(&self) -> LockState {
        self.events()
            .last()
            .map(|(state, _)| *state)
            .unwrap_or(LockState::Engaged)
    }

    /// Number of times the lock was released
    pub fn release_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|(state, _)| *state == LockState::Released)
            .count()
    }

    fn events(&self) -> std::sync::MutexGuard<'_, Vec<(LockState, Instant)>> {
        self.log.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, state: LockState) -> Result<()> {
        if self.log.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::actuation("mock lock failure"));
        }
        self.events().push((state, Instant::now()));
        Ok(())
    }
}

impl LockDevice for MockLock {
    async fn release(&mut self) -> Result<()> {
        self.record(LockState::Released)
    }

    async fn engage(&mut self) -> Result<()> {
        self.record(LockState::Engaged)
    }
}
