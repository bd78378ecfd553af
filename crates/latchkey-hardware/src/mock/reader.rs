//! Mock card reader for testing and development.
//!
//! Cards are presented through a [`MockCardReaderHandle`]; the reader yields
//! them in order from its polls. Dropping every handle disconnects the
//! reader once the queued cards are consumed.

use crate::{
    HardwareError, Result,
    traits::CardReader,
    types::{CardRead, DeviceInfo},
};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Mock card reader driven through a channel.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockCardReader;
/// use latchkey_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///
///     assert!(reader.read_card().await?.is_none());
///
///     handle.present(0xa1b2).await?;
///     let read = reader.read_card().await?.unwrap();
///     assert_eq!(read.card_id().as_str(), "01a1b2");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    event_rx: mpsc::Receiver<CardRead>,
    name: String,
}

impl MockCardReader {
    /// Create a new mock reader with the default name.
    pub fn new() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock Reader")
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockCardReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let reader = Self {
            event_rx,
            name: name.into(),
        };
        (reader, MockCardReaderHandle { event_tx })
    }
}

impl CardReader for MockCardReader {
    async fn read_card(&mut self) -> Result<Option<CardRead>> {
        match self.event_rx.try_recv() {
            Ok(read) => Ok(Some(read)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(HardwareError::disconnected(&self.name)),
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "mock")
    }
}

/// Handle for presenting cards to a [`MockCardReader`].
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    event_tx: mpsc::Sender<CardRead>,
}

impl MockCardReaderHandle {
    /// Present a card with the given raw code.
    ///
    /// # Errors
    ///
    /// `HardwareError::Disconnected` if the reader was dropped.
    pub async fn present(&self, code: u32) -> Result<()> {
        self.event_tx
            .send(CardRead::new(code))
            .await
            .map_err(|_| HardwareError::disconnected("mock reader dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cards_are_read_in_order() {
        let (mut reader, handle) = MockCardReader::new();
        handle.present(1).await.unwrap();
        handle.present(2).await.unwrap();

        assert_eq!(reader.read_card().await.unwrap().unwrap().code, 1);
        assert_eq!(reader.read_card().await.unwrap().unwrap().code, 2);
        assert!(reader.read_card().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects_after_queue_drains() {
        let (mut reader, handle) = MockCardReader::with_name("Door Reader");
        handle.present(1).await.unwrap();
        drop(handle);

        assert!(reader.read_card().await.unwrap().is_some());
        let err = reader.read_card().await.unwrap_err();
        assert!(err.is_disconnected());
        assert_eq!(reader.info().name, "Door Reader");
    }
}
