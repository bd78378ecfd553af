//! Mock status indicator that records every color change.

use crate::{Result, traits::IndicatorDevice, types::LedColor};
use std::sync::{Arc, Mutex, PoisonError};

/// Mock indicator for tests. Clones share history.
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    colors: Arc<Mutex<Vec<LedColor>>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every color shown so far, oldest first
    pub fn history(&self) -> Vec<LedColor> {
        self.colors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Color currently shown, `None` before the first update
    pub fn current(&self) -> Option<LedColor> {
        self.history().last().copied()
    }
}

impl IndicatorDevice for MockIndicator {
    async fn set_color(&mut self, color: LedColor) -> Result<()> {
        self.colors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(color);
        Ok(())
    }
}
