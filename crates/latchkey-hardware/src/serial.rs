//! RDM6300 reader on a serial port.
//!
//! The port is read on a dedicated thread that forwards raw chunks over a
//! channel; polls drain the channel without blocking the runtime.

use crate::{
    HardwareError, Result,
    rdm6300::{BAUD_RATE, FrameParser, RepeatFilter},
    traits::CardReader,
    types::{CardRead, DeviceInfo},
};
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, warn};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const CHUNK_SIZE: usize = 64;

/// RDM6300 card reader attached to a serial device.
#[derive(Debug)]
pub struct SerialCardReader {
    port_name: String,
    chunks: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    parser: FrameParser,
    filter: RepeatFilter,
    rejected_logged: u64,
}

impl SerialCardReader {
    /// Open the port at 9600 8N1 and start the reader thread.
    ///
    /// # Errors
    ///
    /// `HardwareError::Serial` if the port cannot be opened.
    pub fn open(port_name: &str, repeat_window: Duration) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;

        let (tx, rx) = mpsc::channel(64);
        let name = port_name.to_string();
        std::thread::Builder::new()
            .name("rdm6300-reader".to_string())
            .spawn(move || pump(port, tx, name))
            .map_err(|e| HardwareError::initialization_failed(e.to_string()))?;

        debug!(port = port_name, baud = BAUD_RATE, "Serial reader opened");

        Ok(Self {
            port_name: port_name.to_string(),
            chunks: rx,
            parser: FrameParser::new(),
            filter: RepeatFilter::new(repeat_window),
            rejected_logged: 0,
        })
    }
}

/// Copy bytes from the port into the channel until the port fails or the
/// reader is dropped.
fn pump(
    mut port: Box<dyn serialport::SerialPort>,
    tx: mpsc::Sender<std::io::Result<Vec<u8>>>,
    name: String,
) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let message = match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => Err(e),
        };

        let failed = message.is_err();
        if tx.blocking_send(message).is_err() || failed {
            debug!(port = %name, "Serial reader thread stopping");
            return;
        }
    }
}

impl CardReader for SerialCardReader {
    async fn read_card(&mut self) -> Result<Option<CardRead>> {
        loop {
            match self.chunks.try_recv() {
                Ok(Ok(bytes)) => self.parser.feed(&bytes),
                Ok(Err(e)) => {
                    error!(port = %self.port_name, error = %e, "Serial read failed");
                    return Err(HardwareError::disconnected(&self.port_name));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(HardwareError::disconnected(&self.port_name));
                }
            }
        }

        let rejected = self.parser.rejected_frames();
        if rejected > self.rejected_logged {
            warn!(
                port = %self.port_name,
                dropped = rejected - self.rejected_logged,
                "Malformed reader frames dropped"
            );
            self.rejected_logged = rejected;
        }

        while let Some(frame) = self.parser.next_frame() {
            if self.filter.accept(frame.tag) {
                return Ok(Some(CardRead::new(frame.tag)));
            }
        }

        Ok(None)
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("RDM6300", format!("{} @ {BAUD_RATE}", self.port_name))
    }
}
