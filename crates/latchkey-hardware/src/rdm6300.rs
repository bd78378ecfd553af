//! Frame parser for the RDM6300 125 kHz reader.
//!
//! The reader streams one frame per tag read over UART at 9600 baud, and
//! keeps streaming the same frame while the tag stays in the field.
//!
//! # Frame Format
//!
//! ```text
//! STX  version  tag        checksum  ETX
//! 0x02 "01"     "0A1B2C3D" "01"      0x03
//!      2 hex    8 hex      2 hex
//! ```
//!
//! The checksum is the XOR of the five data bytes (version and the four tag
//! bytes). The 32-bit tag is the raw code handed to
//! [`CardId::from_raw_code`](latchkey_core::CardId::from_raw_code).
//!
//! # Usage
//!
//! ```
//! use latchkey_hardware::rdm6300::{FrameParser, Rdm6300Frame};
//!
//! let bytes = Rdm6300Frame::new(0x01, 0x0000_a1b2).encode();
//! let mut parser = FrameParser::new();
//!
//! // Serial reads rarely line up with frame boundaries
//! parser.feed(&bytes[..5]);
//! assert!(parser.next_frame().is_none());
//! parser.feed(&bytes[5..]);
//!
//! assert_eq!(parser.next_frame().unwrap().tag, 0xa1b2);
//! ```

use crate::{HardwareError, Result};
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Start of frame
pub const STX: u8 = 0x02;

/// End of frame
pub const ETX: u8 = 0x03;

/// Hex characters between STX and ETX
pub const PAYLOAD_LEN: usize = 12;

/// STX + payload + ETX
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2;

/// UART speed of the module
pub const BAUD_RATE: u32 = 9600;

/// A tag read again within this window is treated as the same presentation.
pub const DEFAULT_REPEAT_WINDOW: Duration = Duration::from_secs(1);

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// One decoded reader frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rdm6300Frame {
    /// Version / customer byte
    pub version: u8,
    /// Tag code
    pub tag: u32,
}

impl Rdm6300Frame {
    pub fn new(version: u8, tag: u32) -> Self {
        Self { version, tag }
    }

    fn data_bytes(&self) -> [u8; 5] {
        let [t0, t1, t2, t3] = self.tag.to_be_bytes();
        [self.version, t0, t1, t2, t3]
    }

    /// XOR of the five data bytes.
    pub fn checksum(&self) -> u8 {
        self.data_bytes().iter().fold(0, |acc, b| acc ^ b)
    }

    /// Decode the 12 hex characters between STX and ETX.
    ///
    /// # Errors
    ///
    /// `HardwareError::InvalidData` on wrong length, non-hex characters or a
    /// checksum mismatch.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != PAYLOAD_LEN {
            return Err(HardwareError::invalid_data(format!(
                "expected {PAYLOAD_LEN} payload bytes, got {}",
                payload.len()
            )));
        }

        let mut bytes = [0u8; PAYLOAD_LEN / 2];
        for (i, pair) in payload.chunks_exact(2).enumerate() {
            bytes[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }

        let [version, t0, t1, t2, t3, checksum] = bytes;
        let frame = Self::new(version, u32::from_be_bytes([t0, t1, t2, t3]));

        let expected = frame.checksum();
        if checksum != expected {
            return Err(HardwareError::invalid_data(format!(
                "checksum mismatch: got {checksum:02X}, expected {expected:02X}"
            )));
        }

        Ok(frame)
    }

    /// Encode as a complete frame, STX and ETX included.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[0] = STX;
        let data = self.data_bytes();
        let checksum = [self.checksum()];
        for (i, byte) in data.iter().chain(checksum.iter()).enumerate() {
            out[1 + i * 2] = HEX_DIGITS[usize::from(byte >> 4)];
            out[2 + i * 2] = HEX_DIGITS[usize::from(byte & 0x0F)];
        }
        out[FRAME_LEN - 1] = ETX;
        out
    }
}

fn hex_value(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(HardwareError::invalid_data(format!(
            "non-hex byte 0x{c:02X} in frame"
        ))),
    }
}

/// Stateful parser for the reader's byte stream.
///
/// Bytes before STX are discarded. A frame that is cut short by a new STX,
/// lacks its ETX or fails the checksum is dropped and counted.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: BytesMut,
    frames: VecDeque<Rdm6300Frame>,
    rejected: u64,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(FRAME_LEN * 4),
            frames: VecDeque::new(),
            rejected: 0,
        }
    }

    /// Feed bytes read from the serial port.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        loop {
            let Some(stx) = self.buffer.iter().position(|&b| b == STX) else {
                self.buffer.clear();
                return;
            };
            self.buffer.advance(stx);

            if self.buffer.len() < FRAME_LEN {
                return;
            }

            // A new STX inside the frame means the current one was truncated
            if let Some(pos) = self.buffer[1..FRAME_LEN].iter().position(|&b| b == STX) {
                self.buffer.advance(pos + 1);
                self.rejected += 1;
                continue;
            }

            let raw = self.buffer.split_to(FRAME_LEN);
            if raw[FRAME_LEN - 1] != ETX {
                self.rejected += 1;
                continue;
            }

            match Rdm6300Frame::decode(&raw[1..FRAME_LEN - 1]) {
                Ok(frame) => self.frames.push_back(frame),
                Err(_) => self.rejected += 1,
            }
        }
    }

    /// Next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<Rdm6300Frame> {
        self.frames.pop_front()
    }

    pub fn frames_available(&self) -> usize {
        self.frames.len()
    }

    /// Number of malformed frames dropped so far
    pub fn rejected_frames(&self) -> u64 {
        self.rejected
    }

    /// Discard buffered bytes and queued frames.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.frames.clear();
    }
}

/// Suppresses repeated reads of a tag held in the field.
///
/// A read is accepted when the tag differs from the previous one, or when
/// the same tag has not been seen for longer than the window. Every read of
/// the same tag restarts the window, so a card held still is reported once.
#[derive(Debug, Clone)]
pub struct RepeatFilter {
    window: Duration,
    last: Option<(u32, Instant)>,
}

impl RepeatFilter {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether `tag` is a new presentation.
    pub fn accept(&mut self, tag: u32) -> bool {
        let now = Instant::now();
        let is_repeat = matches!(
            self.last,
            Some((last, seen)) if last == tag && now.duration_since(seen) <= self.window
        );
        self.last = Some((tag, now));
        !is_repeat
    }
}

impl Default for RepeatFilter {
    fn default() -> Self {
        Self::new(DEFAULT_REPEAT_WINDOW)
    }
}
