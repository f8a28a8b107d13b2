// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the serial channel shared by all grippers of a fleet.
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};

use crate::exception::GripperResult;

/// Baud rate of the 2F-85 family. The grippers do not support any other rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Upper bound for a single response to arrive.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Describes how to reach the bus the grippers are connected to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Baud rate of the bus.
    pub baud_rate: u32,
    /// Timeout for reading one complete response.
    pub read_timeout: Duration,
    /// Number of grippers on the bus. Unit ids are assigned from 9 upwards.
    pub num_grippers: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            num_grippers: 1,
        }
    }
}

impl ChannelConfig {
    /// Creates a config for `port` with the defaults of the device family.
    pub fn new(port: &str) -> Self {
        ChannelConfig {
            port: port.to_string(),
            ..Default::default()
        }
    }
}

/// Byte-level half-duplex transport underneath the sessions.
///
/// One request is written and one response is read before the next request may start.
#[cfg_attr(test, automock)]
pub trait Channel {
    /// Writes a complete request frame.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
    /// Reads until `buffer` is full or the read timeout elapsed.
    /// Returns the number of bytes which arrived, which is less than `buffer.len()` on timeout.
    fn read_frame(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// [`Channel`] over a serial port, configured for Modbus RTU (8N1).
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    read_timeout: Duration,
}

impl SerialChannel {
    /// Opens the serial port described by `config`.
    /// # Errors
    /// * [`ChannelError`](`crate::exception::GripperException::ChannelError`) if the port cannot be opened.
    pub fn open(config: &ChannelConfig) -> GripperResult<SerialChannel> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.read_timeout)
            .open()?;
        log::info!(
            "opened {} at {} baud for {} gripper(s)",
            config.port,
            config.baud_rate,
            config.num_grippers
        );
        Ok(SerialChannel {
            port,
            read_timeout: config.read_timeout,
        })
    }
}

impl Channel for SerialChannel {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        // bytes left over from a timed out exchange would shift the next response
        self.port.clear(ClearBuffer::Input)?;
        self.port.write_all(frame)?;
        self.port.flush()
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let deadline = read_deadline(Instant::now(), self.read_timeout)?;
        let mut filled = 0;
        while filled < buffer.len() {
            // each read may only wait for what is left of the exchange
            let remaining = match remaining_until(deadline, Instant::now()) {
                Some(remaining) => remaining,
                None => break,
            };
            self.port.set_timeout(remaining)?;
            match self.port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// Point in time by which a whole response has to have arrived.
fn read_deadline(now: Instant, read_timeout: Duration) -> io::Result<Instant> {
    now.checked_add(read_timeout).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("read timeout {:?} is out of range", read_timeout),
        )
    })
}

/// Time left until `deadline`, `None` once it has passed.
fn remaining_until(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|remaining| !remaining.is_zero())
}
