//! Authorization decision engine for the Latchkey door controller.
//!
//! Decides, per presented card, whether the door opens. A local cache of
//! recently verified cards answers on its own while a record is younger
//! than the TTL; otherwise the remote authority is asked and the cache is
//! updated from its answer.
//!
//! # Components
//!
//! - **classify / resolve**: pure decision table, no I/O
//! - **DecisionEngine**: runs one card through cache, authority and state machine
//! - **AccessController**: reader polling loop with actuation and access audits
//! - **StateMachine**: validated `Idle → Detected → … → Granted/Denied → Idle` flow
//! - **Clock**: wall-clock source (`SystemClock`, `FixedClock` for tests)
//!
//! Failures never crash the loop. An unreadable cache is a miss, an
//! unreachable authority is a denial, and lock errors are logged.

pub mod clock;
pub mod controller;
pub mod decision;
pub mod engine;
pub mod state_machine;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{AccessController, RunSummary, StopReason};
pub use decision::{
    CacheAction, CacheStatus, Decision, DecisionSource, Outcome, classify, resolve,
};
pub use engine::DecisionEngine;
pub use state_machine::{DecisionState, StateMachine, StateTransition};
