//! Hardware device abstraction layer for the Latchkey door controller.
//!
//! This crate provides trait-based abstractions for the three peripherals of
//! a door: the proximity card reader, the electromechanical lock and the
//! status indicator. Mock implementations stand in for real hardware in
//! tests and development.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations use native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Poll-based reading**: [`CardReader::read_card`] returns immediately
//!   with `None` when no card is present, so the control loop owns timing.
//! - **Failure-tolerant output**: [`DoorPanel`] logs lock and indicator errors
//!   instead of propagating them.
//!
//! # Device Traits
//!
//! ```no_run
//! use latchkey_hardware::{AccessSignal, DoorPanel, FeedbackSink};
//! use latchkey_hardware::mock::{MockIndicator, MockLock};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mut panel = DoorPanel::new(MockLock::new(), MockIndicator::new());
//! panel.signal(AccessSignal::Granted { hold: Duration::from_secs(5) }).await;
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `hardware-serial`: RDM6300 reader on a serial port (`serialport` crate)

pub mod console;
pub mod devices;
pub mod error;
pub mod feedback;
pub mod mock;
pub mod rdm6300;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use feedback::{AccessSignal, DoorPanel, FeedbackSink};
pub use traits::{CardReader, IndicatorDevice, LockDevice};
pub use types::{CardRead, DeviceInfo, LedColor, LockState};
