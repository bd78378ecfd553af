use crate::client::{AccessCheck, AuthorityClient};
use latchkey_core::{CardId, DeviceIdentity};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct MockState {
    script: VecDeque<AccessCheck>,
    fallback: AccessCheck,
    calls: Vec<(DeviceIdentity, CardId)>,
    call_times: Vec<Instant>,
}

/// Scripted remote authority for tests.
///
/// Answers come from the script in order, then the fallback. Every call is
/// recorded. Clones share state, so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Clone)]
pub struct MockAuthority {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
}

impl MockAuthority {
    /// Mock that always gives the same answer
    pub fn new(fallback: AccessCheck) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                fallback,
                calls: Vec::new(),
                call_times: Vec::new(),
            })),
            delay: None,
        }
    }

    /// Mock that answers with `script` in order, then `Unreachable`
    pub fn scripted(script: impl IntoIterator<Item = AccessCheck>) -> Self {
        let mock = Self::new(AccessCheck::Unreachable);
        mock.lock().script.extend(script);
        mock
    }

    /// Delay every answer, to simulate a slow authority
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue one more answer
    pub fn push(&self, answer: AccessCheck) {
        self.lock().script.push_back(answer);
    }

    /// Number of checks received so far
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Device and card of every check, oldest first
    pub fn calls(&self) -> Vec<(DeviceIdentity, CardId)> {
        self.lock().calls.clone()
    }

    /// When each check was received, oldest first. Follows paused test time.
    pub fn call_times(&self) -> Vec<Instant> {
        self.lock().call_times.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, device: &DeviceIdentity, card: &CardId) -> AccessCheck {
        let mut state = self.lock();
        state.calls.push((device.clone(), card.clone()));
        state.call_times.push(Instant::now());
        let fallback = state.fallback;
        state.script.pop_front().unwrap_or(fallback)
    }
}

impl AuthorityClient for MockAuthority {
    async fn check_access(&self, device: &DeviceIdentity, card: &CardId) -> AccessCheck {
        let answer = self.answer(device, card);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}
