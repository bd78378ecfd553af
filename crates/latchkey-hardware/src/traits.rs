//! Device traits for the door controller.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).
//! They are not object-safe; runtime selection goes through the enum wrappers
//! in [`crate::devices`].

#![allow(async_fn_in_trait)]

use crate::{
    Result,
    types::{CardRead, DeviceInfo, LedColor},
};

/// Proximity card reader.
///
/// # Example
///
/// ```no_run
/// use latchkey_hardware::traits::CardReader;
/// use latchkey_hardware::Result;
///
/// async fn next_card<R: CardReader>(reader: &mut R) -> Result<u32> {
///     loop {
///         if let Some(read) = reader.read_card().await? {
///             return Ok(read.code);
///         }
///     }
/// }
/// ```
pub trait CardReader: Send {
    /// Poll the reader once.
    ///
    /// Returns `Ok(None)` when no new card is present. A card held against
    /// the reader is reported once, not on every poll.
    ///
    /// # Errors
    ///
    /// `HardwareError::Disconnected` when the reader is gone and will never
    /// report a card again.
    async fn read_card(&mut self) -> Result<Option<CardRead>>;

    /// Describe the device.
    fn info(&self) -> DeviceInfo;
}

/// Electromechanical lock.
pub trait LockDevice: Send {
    /// Let the door open.
    async fn release(&mut self) -> Result<()>;

    /// Hold the door shut.
    async fn engage(&mut self) -> Result<()>;
}

/// Status indicator (RGB LED or equivalent).
pub trait IndicatorDevice: Send {
    /// Show a single color, replacing the previous one.
    async fn set_color(&mut self, color: LedColor) -> Result<()>;
}
