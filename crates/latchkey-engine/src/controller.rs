//! Door control loop.
//!
//! Polls the reader, hands each card to the [`DecisionEngine`], drives the
//! feedback sink with the outcome and fires the access audit for grants.
//! One card is handled to completion (including the lock hold) before the
//! reader is polled again.

use crate::clock::Clock;
use crate::engine::DecisionEngine;
use latchkey_core::CardId;
use latchkey_core::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_UNLOCK_SECS};
use latchkey_hardware::{AccessSignal, CardReader, FeedbackSink};
use latchkey_network::{AccessCheck, AuthorityClient};
use latchkey_storage::CardCache;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Why [`AccessController::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed
    Shutdown,
    /// The reader reported it is gone for good
    ReaderDisconnected,
}

/// Counters for one run of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub events: u64,
    pub grants: u64,
    pub denials: u64,
    pub stop: StopReason,
}

/// Reader → engine → sink loop with background access audits.
#[derive(Debug)]
pub struct AccessController<R, S, C, A, K> {
    reader: R,
    sink: S,
    engine: DecisionEngine<C, A, K>,
    unlock: Duration,
    poll_interval: Duration,
    audits: JoinSet<AccessCheck>,
    last_signal: Option<AccessSignal>,
}

impl<R, S, C, A, K> AccessController<R, S, C, A, K>
where
    R: CardReader,
    S: FeedbackSink,
    C: CardCache,
    A: AuthorityClient,
    K: Clock,
{
    pub fn new(reader: R, sink: S, engine: DecisionEngine<C, A, K>) -> Self {
        Self {
            reader,
            sink,
            engine,
            unlock: Duration::from_secs(DEFAULT_UNLOCK_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            audits: JoinSet::new(),
            last_signal: None,
        }
    }

    /// How long the lock stays released on a grant
    pub fn with_unlock(mut self, unlock: Duration) -> Self {
        self.unlock = unlock;
        self
    }

    /// Pause between reader polls while no card is present
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn engine(&self) -> &DecisionEngine<C, A, K> {
        &self.engine
    }

    /// Number of audit calls still in flight
    pub fn pending_audits(&self) -> usize {
        self.audits.len()
    }

    /// Run until `shutdown` completes or the reader disconnects.
    ///
    /// Shutdown is only observed between cards, so a released lock is always
    /// engaged again before this returns. Pending audits are awaited before
    /// returning.
    pub async fn run<F>(&mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        let mut summary = RunSummary {
            events: 0,
            grants: 0,
            denials: 0,
            stop: StopReason::Shutdown,
        };

        info!(
            reader = %self.reader.info(),
            device_id = %self.engine.device(),
            "Door controller ready"
        );
        self.emit(AccessSignal::Ready).await;

        loop {
            self.reap_audits();

            let read = tokio::select! {
                _ = &mut shutdown => break,
                read = self.reader.read_card() => read,
            };

            match read {
                Ok(Some(read)) => {
                    summary.events += 1;
                    if self.handle(read.card_id()).await {
                        summary.grants += 1;
                    } else {
                        summary.denials += 1;
                    }
                    continue;
                }
                Ok(None) => {
                    if self.last_signal != Some(AccessSignal::Waiting) {
                        self.emit(AccessSignal::Waiting).await;
                    }
                }
                Err(e) if e.is_disconnected() => {
                    error!(error = %e, "Card reader disconnected");
                    summary.stop = StopReason::ReaderDisconnected;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Card read failed");
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.drain_audits().await;
        info!(
            events = summary.events,
            grants = summary.grants,
            denials = summary.denials,
            stop = ?summary.stop,
            "Door controller stopped"
        );
        summary
    }

    /// Decide on one card and act on it. Returns whether access was granted.
    async fn handle(&mut self, card: CardId) -> bool {
        let outcome = self.engine.evaluate(&card).await;

        if outcome.is_granted() {
            self.emit(AccessSignal::Granted { hold: self.unlock }).await;
            self.spawn_audit(card);
            true
        } else {
            self.emit(AccessSignal::Denied).await;
            false
        }
    }

    async fn emit(&mut self, signal: AccessSignal) {
        self.sink.signal(signal).await;
        self.last_signal = Some(signal);
    }

    /// Best-effort access log: the same check, answer ignored.
    fn spawn_audit(&mut self, card: CardId) {
        let authority = Arc::clone(self.engine.authority());
        let device = self.engine.device().clone();
        self.audits
            .spawn(async move { authority.check_access(&device, &card).await });
    }

    fn reap_audits(&mut self) {
        while let Some(result) = self.audits.try_join_next() {
            log_audit(result);
        }
    }

    async fn drain_audits(&mut self) {
        if !self.audits.is_empty() {
            debug!(pending = self.audits.len(), "Waiting for access audits");
        }
        while let Some(result) = self.audits.join_next().await {
            log_audit(result);
        }
    }
}

fn log_audit(result: Result<AccessCheck, tokio::task::JoinError>) {
    match result {
        Ok(check) => debug!(%check, "Access audit sent"),
        Err(e) => warn!(error = %e, "Access audit task failed"),
    }
}
