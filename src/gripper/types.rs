// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Register addresses, frame lengths and command types of the 2F-85 Modbus RTU interface.
use serde::Deserialize;
use serde::Serialize;

/// Unit id of the gripper with device index 0. Further grippers count upwards.
pub const FIRST_UNIT_ID: u8 = 0x09;
/// Highest unit id a Modbus RTU slave may use.
pub const MAX_UNIT_ID: u8 = 247;
/// Number of grippers which fit on one bus.
pub const MAX_GRIPPERS: usize = (MAX_UNIT_ID - FIRST_UNIT_ID) as usize + 1;

pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

/// First register of the robot output (action request) block.
pub const ACTION_REGISTER_ADDRESS: u16 = 0x03E8;
/// Number of 16 bit registers written by an action request.
pub const ACTION_REGISTER_COUNT: u16 = 3;
/// First register of the robot input (status) block.
pub const STATUS_REGISTER_ADDRESS: u16 = 0x07D0;
/// Number of 16 bit registers read by a status request.
pub const STATUS_REGISTER_COUNT: u16 = 8;

pub const CRC_LEN: usize = 2;
/// Unit id, function code and CRC. Nothing shorter can be a frame.
pub const MIN_FRAME_LEN: usize = 2 + CRC_LEN;
pub const ACTION_PAYLOAD_LEN: usize = 2 * ACTION_REGISTER_COUNT as usize;
pub const STATUS_PAYLOAD_LEN: usize = 2 * STATUS_REGISTER_COUNT as usize;
pub const ACTION_HEADER_LEN: usize = 7;
pub const ACTION_REQUEST_LEN: usize = ACTION_HEADER_LEN + ACTION_PAYLOAD_LEN + CRC_LEN;
pub const ACTION_RESPONSE_LEN: usize = 8;
pub const STATUS_REQUEST_LEN: usize = 8;
pub const STATUS_RESPONSE_LEN: usize = 3 + STATUS_PAYLOAD_LEN + CRC_LEN;

/// Bits of the action request (control) byte.
pub mod control_bits {
    /// rACT: activate the gripper.
    pub const ACTIVATE: u8 = 0x01;
    /// rGTO: move to the requested position.
    pub const GO_TO: u8 = 0x08;
    /// rATR: automatic (emergency) release.
    pub const AUTO_RELEASE: u8 = 0x10;
    /// rARD: direction of the automatic release, set = open.
    pub const AUTO_RELEASE_OPEN: u8 = 0x20;
}

/// Offsets into a 21 byte status response.
pub(crate) mod status_offsets {
    pub const GRIPPER_STATUS: usize = 3;
    pub const FAULT_STATUS: usize = 5;
    pub const POSITION_REQUEST_ECHO: usize = 6;
    pub const POSITION: usize = 7;
    pub const CURRENT: usize = 8;
}

/// Normalized goto command. All values are clamped to \[0, 1\] before they are encoded.
///
/// A position of 0 is fully open, 1 fully closed.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct ActuationIntent {
    pub pos: f64,
    pub vel: f64,
    pub force: f64,
}

impl ActuationIntent {
    pub fn new(pos: f64, vel: f64, force: f64) -> Self {
        ActuationIntent { pos, vel, force }
    }
}

impl Default for ActuationIntent {
    fn default() -> Self {
        ActuationIntent::new(0., 1., 1.)
    }
}

/// Everything a gripper can be told to do with an action request.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum Intent {
    /// Move the fingers. Sets rACT and rGTO.
    Goto(ActuationIntent),
    /// Stop a running motion. Keeps the gripper activated.
    Stop,
    /// Set rACT. Position, speed and force keep their last commanded values.
    Activate,
    /// Clear rACT. The gripper goes into reset.
    Deactivate,
    /// Automatic release: slow motion to the fully open or fully closed position.
    EmergencyRelease { open: bool },
    /// Clear rATR again, leaving every other bit as it was.
    ClearEmergencyRelease,
}

impl Intent {
    /// Shortcut for [`Intent::Goto`].
    pub fn goto(pos: f64, vel: f64, force: f64) -> Self {
        Intent::Goto(ActuationIntent::new(pos, vel, force))
    }
}

/// The six bytes of the robot output registers as last commanded.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActionRegisters {
    pub control: u8,
    pub position: u8,
    pub speed: u8,
    pub force: u8,
}

impl Default for ActionRegisters {
    fn default() -> Self {
        ActionRegisters {
            control: 0,
            position: 0,
            speed: 255,
            force: 150,
        }
    }
}

impl ActionRegisters {
    /// Register layout: action request, two reserved bytes, position, speed, force.
    pub fn to_payload(&self) -> [u8; ACTION_PAYLOAD_LEN] {
        [
            self.control,
            0x00,
            0x00,
            self.position,
            self.speed,
            self.force,
        ]
    }
}

/// Modbus unit id of the gripper with the given device index.
/// `None` from [`MAX_GRIPPERS`] on, where the id would leave the slave address range.
pub fn unit_id(device: usize) -> Option<u8> {
    if device >= MAX_GRIPPERS {
        return None;
    }
    Some(FIRST_UNIT_ID + device as u8)
}
