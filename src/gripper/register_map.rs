// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Maps intents onto the action registers and status registers onto a [`GripperState`].
use crate::gripper::gripper_state::{GripperState, MAX_WIDTH, RAW_CLOSED, RAW_OPEN};
use crate::gripper::types::control_bits::{ACTIVATE, AUTO_RELEASE, AUTO_RELEASE_OPEN, GO_TO};
use crate::gripper::types::status_offsets::{
    CURRENT, FAULT_STATUS, GRIPPER_STATUS, POSITION, POSITION_REQUEST_ECHO,
};
use crate::gripper::types::{ActionRegisters, ActuationIntent, Intent, STATUS_RESPONSE_LEN};

/// Slowest finger speed. Unit: \[m/s\].
pub const MIN_SPEED: f64 = 0.013;
/// Fastest finger speed. Unit: \[m/s\].
pub const MAX_SPEED: f64 = 0.1;
/// Lowest grip force. Unit: \[N\].
pub const MIN_FORCE: f64 = 5.;
/// Highest grip force. Unit: \[N\].
pub const MAX_FORCE: f64 = 220.;

/// Clamps `value` to \[0, 1\] and scales it onto a register byte, rounding half away from zero.
/// NaN is treated as 0.
pub fn quantize(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0., 1.) * 255.).round() as u8
}

/// Computes the registers to send for `intent` given the registers sent last.
///
/// Bits of the control byte the intent does not talk about keep their previous value, so an
/// automatic release stays requested through later goto or stop commands until it is cleared.
pub fn encode_intent(intent: &Intent, last: &ActionRegisters) -> ActionRegisters {
    let mut next = *last;
    match intent {
        Intent::Goto(ActuationIntent { pos, vel, force }) => {
            next.control |= ACTIVATE | GO_TO;
            next.position = quantize(*pos);
            next.speed = quantize(*vel);
            next.force = quantize(*force);
        }
        Intent::Stop => {
            next.control |= ACTIVATE;
            next.control &= !GO_TO;
        }
        Intent::Activate => next.control |= ACTIVATE,
        Intent::Deactivate => next.control &= !ACTIVATE,
        Intent::EmergencyRelease { open } => {
            next.control |= AUTO_RELEASE;
            if *open {
                next.control |= AUTO_RELEASE_OPEN;
            } else {
                next.control &= !AUTO_RELEASE_OPEN;
            }
        }
        Intent::ClearEmergencyRelease => next.control &= !AUTO_RELEASE,
    }
    next
}

/// Decodes a status response. Every 21 byte input yields a state; the CRC has to be checked
/// beforehand.
pub fn decode_status(raw: &[u8; STATUS_RESPONSE_LEN]) -> GripperState {
    let status = raw[GRIPPER_STATUS];
    GripperState {
        activated: status & 0x01 != 0,
        go_to: (status >> 3) & 0x01 != 0,
        status: (status >> 4) & 0x03,
        object: (status >> 6) & 0x03,
        fault: raw[FAULT_STATUS] & 0x0F,
        controller_fault: raw[FAULT_STATUS] >> 4,
        requested_position: raw[POSITION_REQUEST_ECHO],
        position: raw[POSITION],
        current: raw[CURRENT],
    }
}

impl ActuationIntent {
    /// Builds a goto command from physical units.
    /// # Arguments
    /// * `width` - Intended opening width. \[m\]
    /// * `speed` - Finger speed. \[m/s\]
    /// * `force` - Grip force. \[N\]
    pub fn from_metric(width: f64, speed: f64, force: f64) -> Self {
        let raw_position = (RAW_OPEN - RAW_CLOSED) / MAX_WIDTH * width.clamp(0., MAX_WIDTH)
            + RAW_CLOSED;
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        let force = force.clamp(MIN_FORCE, MAX_FORCE);
        ActuationIntent {
            pos: raw_position / 255.,
            vel: (speed - MIN_SPEED) / (MAX_SPEED - MIN_SPEED),
            force: (force - MIN_FORCE) / (MAX_FORCE - MIN_FORCE),
        }
    }
}
