//! Mock device implementations for testing and development.

mod indicator;
mod lock;
mod reader;

pub use indicator::MockIndicator;
pub use lock::MockLock;
pub use reader::{MockCardReader, MockCardReaderHandle};
