//! Enum wrapper for card reader dispatch.
//!
//! Native `async fn` in traits are not object-safe, so `Box<dyn CardReader>`
//! is not available. [`AnyCardReader`] gives the binary a single concrete
//! type whose variant is chosen at start-up from the configuration.
//!
//! # Examples
//!
//! ```
//! use latchkey_hardware::devices::AnyCardReader;
//! use latchkey_hardware::mock::MockCardReader;
//! use latchkey_hardware::traits::CardReader;
//!
//! let (reader, _handle) = MockCardReader::new();
//! let reader = AnyCardReader::Mock(reader);
//! assert_eq!(reader.info().name, "Mock Reader");
//! ```

use crate::console::LineCardReader;
use crate::mock::MockCardReader;
#[cfg(feature = "hardware-serial")]
use crate::serial::SerialCardReader;
use crate::traits::CardReader;
use crate::{CardRead, DeviceInfo, Result};
use tokio::io::{BufReader, Stdin};

/// Card reader selected at runtime.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Mock reader for development and testing.
    Mock(MockCardReader),

    /// Hex codes typed on standard input.
    Stdin(LineCardReader<BufReader<Stdin>>),

    /// RDM6300 on a serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialCardReader),
}

impl CardReader for AnyCardReader {
    async fn read_card(&mut self) -> Result<Option<CardRead>> {
        match self {
            Self::Mock(device) => device.read_card().await,
            Self::Stdin(device) => device.read_card().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.read_card().await,
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
            Self::Stdin(device) => device.info(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.info(),
        }
    }
}
