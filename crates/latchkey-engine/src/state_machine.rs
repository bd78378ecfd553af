//! Decision state machine.
//!
//! Tracks where the engine is in the evaluation of one card and rejects
//! any step that skips or reorders the flow.
//!
//! # States
//!
//! - `Idle`: no card being evaluated
//! - `Detected`: a card was presented
//! - `CacheHitFresh`: cached and inside the TTL
//! - `CacheHitStale`: cached but older than the TTL
//! - `CacheMiss`: not cached
//! - `Granted` / `Denied`: final decision for the card
//!
//! # Valid Transitions
//!
//! - Idle → Detected → CacheHitFresh → Granted
//! - Detected → CacheHitStale → Granted/Denied
//! - Detected → CacheMiss → Granted/Denied
//! - Granted/Denied → Idle
//!
//! # Examples
//!
//! ```
//! use latchkey_engine::{DecisionState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(DecisionState::Detected).unwrap();
//! machine.transition_to(DecisionState::CacheMiss).unwrap();
//!
//! // A fresh cache hit cannot follow a miss
//! assert!(machine.transition_to(DecisionState::CacheHitFresh).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use latchkey_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// One card evaluation takes four transitions, so this holds the last 25
/// evaluations.
const MAX_HISTORY_SIZE: usize = 100;

/// States of a single card evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionState {
    Idle,
    Detected,
    CacheHitFresh,
    CacheHitStale,
    CacheMiss,
    Granted,
    Denied,
}

impl fmt::Display for DecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            DecisionState::Idle => "Idle",
            DecisionState::Detected => "Detected",
            DecisionState::CacheHitFresh => "CacheHitFresh",
            DecisionState::CacheHitStale => "CacheHitStale",
            DecisionState::CacheMiss => "CacheMiss",
            DecisionState::Granted => "Granted",
            DecisionState::Denied => "Denied",
        };
        write!(f, "{}", state_str)
    }
}

impl DecisionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use latchkey_engine::DecisionState;
    ///
    /// assert!(DecisionState::Idle.can_transition_to(&DecisionState::Detected));
    /// assert!(!DecisionState::CacheHitFresh.can_transition_to(&DecisionState::Denied));
    /// ```
    pub fn can_transition_to(&self, target: &DecisionState) -> bool {
        matches!(
            (self, target),
            (DecisionState::Idle, DecisionState::Detected)
                | (
                    DecisionState::Detected,
                    DecisionState::CacheHitFresh
                        | DecisionState::CacheHitStale
                        | DecisionState::CacheMiss
                )
                | (DecisionState::CacheHitFresh, DecisionState::Granted)
                | (
                    DecisionState::CacheHitStale | DecisionState::CacheMiss,
                    DecisionState::Granted | DecisionState::Denied
                )
                | (DecisionState::Granted | DecisionState::Denied, DecisionState::Idle)
        )
    }

    /// Whether this state ends an evaluation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecisionState::Granted | DecisionState::Denied)
    }
}

/// A single state transition with timestamp.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: DecisionState,
    pub to: DecisionState,
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: DecisionState, to: DecisionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// State machine for the card evaluation flow.
///
/// Not thread-safe; owned by a single [`DecisionEngine`](crate::DecisionEngine).
#[derive(Debug)]
pub struct StateMachine {
    current_state: DecisionState,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current_state: DecisionState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> &DecisionState {
        &self.current_state
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not valid
    /// from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: DecisionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());

        Ok(transition)
    }

    /// Force the machine back to Idle, for recovery after an aborted
    /// evaluation.
    pub fn reset(&mut self) -> StateTransition {
        let transition = StateTransition::new(self.current_state, DecisionState::Idle);
        self.perform_state_change(DecisionState::Idle, transition.clone());
        transition
    }

    fn perform_state_change(&mut self, new_state: DecisionState, transition: StateTransition) {
        self.current_state = new_state;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
