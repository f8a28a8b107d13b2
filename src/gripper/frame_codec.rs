// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Builds and checks Modbus RTU frames for the two commands the gripper understands.
//!
//! The CRC is the Modbus CRC-16 (reflected polynomial 0xA001, initial value 0xFFFF),
//! appended low byte first.
use crate::exception::{GripperException, GripperResult};
use crate::gripper::types::{
    ACTION_HEADER_LEN, ACTION_PAYLOAD_LEN, ACTION_REGISTER_ADDRESS, ACTION_REGISTER_COUNT,
    ACTION_REQUEST_LEN, CRC_LEN, MIN_FRAME_LEN, READ_HOLDING_REGISTERS, STATUS_REGISTER_ADDRESS,
    STATUS_REGISTER_COUNT, STATUS_REQUEST_LEN, WRITE_MULTIPLE_REGISTERS,
};

const CRC_POLYNOMIAL: u16 = 0xA001;

pub fn compute_crc(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in bytes {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Writes the CRC of everything but the last two bytes into the last two bytes.
fn seal(frame: &mut [u8]) {
    let body_len = frame.len() - CRC_LEN;
    let crc = compute_crc(&frame[..body_len]);
    frame[body_len..].copy_from_slice(&crc.to_le_bytes());
}

/// Returns the CRC carried by a frame next to the one computed over its body.
/// Frames shorter than [`MIN_FRAME_LEN`] yield `None` without computing anything.
fn crc_pair(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < MIN_FRAME_LEN {
        return None;
    }
    let body_len = frame.len() - CRC_LEN;
    let received = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);
    Some((compute_crc(&frame[..body_len]), received))
}

/// Checks the trailing CRC of a frame.
///
/// Pass/fail only. Like every 16 bit CRC, a corruption that happens to produce the same
/// checksum (about one in 65536 for random multi-bit damage) is not detected. Any single bit
/// flip is.
pub fn verify(frame: &[u8]) -> bool {
    matches!(crc_pair(frame), Some((computed, received)) if computed == received)
}

/// Checks that `frame` has the length the command expects and a valid CRC.
/// # Errors
/// * [`FramingError`](`crate::exception::GripperException::FramingError`) on a length mismatch.
/// * [`IntegrityError`](`crate::exception::GripperException::IntegrityError`) on a CRC mismatch.
pub fn validate_response(frame: &[u8], expected_len: usize) -> GripperResult<()> {
    if frame.len() != expected_len {
        return Err(GripperException::FramingError {
            expected: expected_len,
            received: frame.len(),
        });
    }
    match crc_pair(frame) {
        Some((computed, received)) if computed == received => Ok(()),
        Some((computed, received)) => {
            Err(GripperException::IntegrityError { computed, received })
        }
        None => Err(GripperException::FramingError {
            expected: expected_len,
            received: frame.len(),
        }),
    }
}

/// Write-multiple-registers request carrying the six action register bytes.
pub fn encode_action_frame(
    unit_id: u8,
    registers: &[u8; ACTION_PAYLOAD_LEN],
) -> [u8; ACTION_REQUEST_LEN] {
    let address = ACTION_REGISTER_ADDRESS.to_be_bytes();
    let count = ACTION_REGISTER_COUNT.to_be_bytes();
    let mut frame = [0; ACTION_REQUEST_LEN];
    frame[..ACTION_HEADER_LEN].copy_from_slice(&[
        unit_id,
        WRITE_MULTIPLE_REGISTERS,
        address[0],
        address[1],
        count[0],
        count[1],
        ACTION_PAYLOAD_LEN as u8,
    ]);
    frame[ACTION_HEADER_LEN..ACTION_HEADER_LEN + ACTION_PAYLOAD_LEN].copy_from_slice(registers);
    seal(&mut frame);
    frame
}

/// Read-holding-registers request for the whole status block.
pub fn encode_status_request(unit_id: u8) -> [u8; STATUS_REQUEST_LEN] {
    let address = STATUS_REGISTER_ADDRESS.to_be_bytes();
    let count = STATUS_REGISTER_COUNT.to_be_bytes();
    let mut frame = [
        unit_id,
        READ_HOLDING_REGISTERS,
        address[0],
        address[1],
        count[0],
        count[1],
        0,
        0,
    ];
    seal(&mut frame);
    frame
}
