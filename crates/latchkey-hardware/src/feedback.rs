//! Actuation and feedback sink.
//!
//! The control loop reports what happened as an [`AccessSignal`]; the sink
//! turns it into lock and indicator actions:
//!
//! | Signal    | Indicator | Lock                              |
//! |-----------|-----------|-----------------------------------|
//! | `Ready`   | yellow    | -                                 |
//! | `Waiting` | blue      | -                                 |
//! | `Granted` | green     | released for `hold`, then engaged |
//! | `Denied`  | red       | -                                 |
//!
//! Device failures are logged and never propagated: a broken LED must not
//! stop the door from working, and a broken relay must not stop the loop.

#![allow(async_fn_in_trait)]

use crate::{
    traits::{IndicatorDevice, LockDevice},
    types::LedColor,
};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Outcome reported to the door panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSignal {
    /// Controller started and is ready
    Ready,
    /// Idle, waiting for a card
    Waiting,
    /// Open the door for `hold`
    Granted { hold: Duration },
    /// Refuse the card
    Denied,
}

impl AccessSignal {
    /// Indicator color for this signal
    pub fn color(&self) -> LedColor {
        match self {
            AccessSignal::Ready => LedColor::Yellow,
            AccessSignal::Waiting => LedColor::Blue,
            AccessSignal::Granted { .. } => LedColor::Green,
            AccessSignal::Denied => LedColor::Red,
        }
    }
}

/// Consumer of access signals.
pub trait FeedbackSink: Send {
    /// Act on a signal. Returns once any actuation is complete.
    async fn signal(&mut self, signal: AccessSignal);
}

/// Lock plus status indicator.
#[derive(Debug)]
pub struct DoorPanel<L, I> {
    lock: L,
    indicator: I,
}

impl<L: LockDevice, I: IndicatorDevice> DoorPanel<L, I> {
    pub fn new(lock: L, indicator: I) -> Self {
        Self { lock, indicator }
    }

    async fn show(&mut self, color: LedColor) {
        if let Err(e) = self.indicator.set_color(color).await {
            warn!(%color, error = %e, "Indicator update failed");
        }
    }

    async fn open_for(&mut self, hold: Duration) {
        if let Err(e) = self.lock.release().await {
            error!(error = %e, "Lock release failed");
            return;
        }
        debug!(hold_ms = hold.as_millis() as u64, "Door unlocked");

        tokio::time::sleep(hold).await;

        if let Err(e) = self.lock.engage().await {
            error!(error = %e, "Lock engage failed");
        }
    }
}

impl<L: LockDevice, I: IndicatorDevice> FeedbackSink for DoorPanel<L, I> {
    async fn signal(&mut self, signal: AccessSignal) {
        self.show(signal.color()).await;

        if let AccessSignal::Granted { hold } = signal {
            self.open_for(hold).await;
        }
    }
}
