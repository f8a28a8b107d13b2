// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents all kind of errors which can occur while talking to a gripper on the bus.
///
/// The boolean API of [`GripperFleet`](`crate::GripperFleet`) collapses these into `false`,
/// the `try_*` variants hand them out unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GripperException {
    /// ChannelError is returned if the serial port cannot be opened, written or read.
    #[error("{message:?}")]
    ChannelError { message: String },

    /// FramingError is returned if a response does not have the length its command expects.
    #[error("Expected a response of {expected} bytes but received {received} bytes")]
    FramingError {
        /// Length required for the command type.
        expected: usize,
        /// Number of bytes which arrived before the timeout.
        received: usize,
    },

    /// IntegrityError is returned if the trailing CRC of a response does not match its content.
    #[error("CRC mismatch: computed {computed:#06x}, received {received:#06x}")]
    IntegrityError {
        /// CRC computed over the received bytes.
        computed: u16,
        /// CRC carried by the frame.
        received: u16,
    },

    /// BoundsError is returned if a device index does not address a gripper of the fleet.
    #[error("Device index {device} is out of range for a fleet of {count} grippers")]
    BoundsError { device: usize, count: usize },

    /// ClosedError is returned for every operation after the session or fleet was shut down.
    #[error("Gripper session is closed")]
    ClosedError,
}

impl GripperException {
    /// Returns the kind of this exception without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GripperException::ChannelError { .. } => ErrorKind::Channel,
            GripperException::FramingError { .. } => ErrorKind::Framing,
            GripperException::IntegrityError { .. } => ErrorKind::Integrity,
            GripperException::BoundsError { .. } => ErrorKind::Bounds,
            GripperException::ClosedError => ErrorKind::Closed,
        }
    }
}

/// Payload-free discriminant of a [`GripperException`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Channel,
    Framing,
    Integrity,
    Bounds,
    Closed,
}

impl From<std::io::Error> for GripperException {
    fn from(error: std::io::Error) -> Self {
        GripperException::ChannelError {
            message: error.to_string(),
        }
    }
}

impl From<serialport::Error> for GripperException {
    fn from(error: serialport::Error) -> Self {
        GripperException::ChannelError {
            message: error.to_string(),
        }
    }
}

/// creates a ChannelError from a static string slice
pub(crate) fn create_channel_exception(message: &'static str) -> GripperException {
    GripperException::ChannelError {
        message: message.to_string(),
    }
}

/// Result type which can have GripperException as Error
pub type GripperResult<T> = Result<T, GripperException>;
