//! Console devices for running the controller without hardware.
//!
//! [`LineCardReader`] takes one raw code per line, in hex with an optional
//! `0x` prefix. The lock and indicator only log what they would do.

use crate::{
    HardwareError, Result,
    traits::{CardReader, IndicatorDevice, LockDevice},
    types::{CardRead, DeviceInfo, LedColor, LockState},
};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

/// Card reader fed by text lines.
#[derive(Debug)]
pub struct LineCardReader<R> {
    lines: Lines<R>,
    poll_timeout: Duration,
    name: String,
}

impl LineCardReader<BufReader<Stdin>> {
    /// Reader on standard input.
    pub fn stdin(poll_timeout: Duration) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), poll_timeout, "stdin")
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineCardReader<R> {
    pub fn new(input: R, poll_timeout: Duration, name: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            poll_timeout,
            name: name.into(),
        }
    }
}

/// Parse a raw code typed by an operator.
///
/// ```
/// use latchkey_hardware::console::parse_code;
///
/// assert_eq!(parse_code("a1b2").unwrap(), 0xa1b2);
/// assert_eq!(parse_code(" 0xFFEE ").unwrap(), 0xffee);
/// assert!(parse_code("zz").is_err());
/// ```
pub fn parse_code(line: &str) -> Result<u32> {
    let trimmed = line.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u32::from_str_radix(digits, 16)
        .map_err(|e| HardwareError::invalid_data(format!("'{trimmed}' is not a hex card code: {e}")))
}

impl<R: AsyncBufRead + Unpin + Send> CardReader for LineCardReader<R> {
    async fn read_card(&mut self) -> Result<Option<CardRead>> {
        let line = match tokio::time::timeout(self.poll_timeout, self.lines.next_line()).await {
            Err(_elapsed) => return Ok(None),
            Ok(result) => result?,
        };

        let Some(line) = line else {
            return Err(HardwareError::disconnected(&self.name));
        };

        if line.trim().is_empty() {
            return Ok(None);
        }

        let code = parse_code(&line)?;
        debug!(code = format_args!("{code:x}"), "Card code entered");
        Ok(Some(CardRead::new(code)))
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "line input")
    }
}

/// Lock that logs its actuations.
#[derive(Debug)]
pub struct ConsoleLock {
    state: LockState,
}

impl ConsoleLock {
    pub fn new() -> Self {
        Self {
            state: LockState::Engaged,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }
}

impl Default for ConsoleLock {
    fn default() -> Self {
        Self::new()
    }
}

impl LockDevice for ConsoleLock {
    async fn release(&mut self) -> Result<()> {
        self.state = LockState::Released;
        info!("Lock released");
        Ok(())
    }

    async fn engage(&mut self) -> Result<()> {
        self.state = LockState::Engaged;
        info!("Lock engaged");
        Ok(())
    }
}

/// Indicator that logs its color.
#[derive(Debug, Default)]
pub struct ConsoleIndicator;

impl IndicatorDevice for ConsoleIndicator {
    async fn set_color(&mut self, color: LedColor) -> Result<()> {
        info!(%color, "Indicator");
        Ok(())
    }
}
