// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the robotiq::GripperState type.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::Deserialize;
use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Stroke of the 2F-85 fingers. Unit: \[m\].
pub const MAX_WIDTH: f64 = 0.085;
/// Raw position register value of the fully open gripper.
pub(crate) const RAW_OPEN: f64 = 3.;
/// Raw position register value of the fully closed gripper.
pub(crate) const RAW_CLOSED: f64 = 230.;
/// Knuckle angle of the fully closed gripper. Unit: \[rad\].
pub const MAX_KNUCKLE_ANGLE: f64 = 0.8;

/// gSTA: activation phase reported by the gripper.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[derive(FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ActivationStatus {
    /// Gripper is in reset or automatic release state.
    Reset = 0,
    /// Activation is in progress.
    Activating = 1,
    /// Not used by the firmware.
    Unused = 2,
    /// Activation is completed.
    Activated = 3,
}

/// gOBJ: what stopped the fingers, if anything.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[derive(FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ObjectStatus {
    /// Fingers are in motion towards the requested position. No object detected.
    Moving = 0,
    /// Fingers have stopped due to a contact while opening.
    ContactWhileOpening = 1,
    /// Fingers have stopped due to a contact while closing.
    ContactWhileClosing = 2,
    /// Fingers are at the requested position. No object detected or object has been lost.
    AtRequestedPosition = 3,
}

/// gFLT: fault codes documented for the 2F-85.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[derive(FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum FaultStatus {
    NoFault = 0x00,
    /// Action delayed, the activation must be completed prior to perform the action.
    ActivationIncomplete = 0x05,
    /// The activation bit must be set prior to perform the action.
    ActivationBitNotSet = 0x07,
    /// Maximum operating temperature exceeded, wait for cool-down.
    OverTemperature = 0x08,
    /// No communication during at least 1 second.
    CommunicationTimeout = 0x09,
    /// Under minimum operating voltage.
    UnderVoltage = 0x0A,
    /// Automatic release in progress.
    AutomaticReleaseInProgress = 0x0B,
    /// Internal processor fault.
    InternalFault = 0x0C,
    /// Activation fault, verify that no interference or other error occurred.
    ActivationFault = 0x0D,
    /// Overcurrent triggered.
    OverCurrent = 0x0E,
    /// Automatic release completed.
    AutomaticReleaseCompleted = 0x0F,
}

/// Describes the gripper state as decoded from the last successful status exchange.
///
/// All fields hold the raw register values. Codes outside the documented ranges are kept as
/// they were received.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct GripperState {
    /// gACT: activation bit echo.
    pub activated: bool,
    /// gGTO: go-to bit echo.
    pub go_to: bool,
    /// gSTA: activation phase, see [`ActivationStatus`].
    pub status: u8,
    /// gOBJ: object detection, see [`ObjectStatus`].
    pub object: u8,
    /// gFLT: fault code, see [`FaultStatus`].
    pub fault: u8,
    /// kFLT: controller specific fault code.
    pub controller_fault: u8,
    /// gPR: echo of the requested position. 0 is open, 255 closed.
    pub requested_position: u8,
    /// gPO: actual position. 0 is open, 255 closed.
    pub position: u8,
    /// gCU: motor current, about 10 mA per count.
    pub current: u8,
}

impl GripperState {
    pub fn is_ready(&self) -> bool {
        self.status == ActivationStatus::Activated as u8 && self.activated
    }

    pub fn is_reset(&self) -> bool {
        self.status == ActivationStatus::Reset as u8 || !self.activated
    }

    pub fn is_moving(&self) -> bool {
        self.go_to && self.object == ObjectStatus::Moving as u8
    }

    /// True once the fingers came to rest, either on an object or at the requested position.
    pub fn is_stopped(&self) -> bool {
        self.object != ObjectStatus::Moving as u8
    }

    pub fn object_detected(&self) -> bool {
        self.object == ObjectStatus::ContactWhileOpening as u8
            || self.object == ObjectStatus::ContactWhileClosing as u8
    }

    pub fn activation_status(&self) -> Option<ActivationStatus> {
        ActivationStatus::from_u8(self.status)
    }

    pub fn object_status(&self) -> Option<ObjectStatus> {
        ObjectStatus::from_u8(self.object)
    }

    /// `None` for codes the gripper documentation does not list.
    pub fn fault_status(&self) -> Option<FaultStatus> {
        FaultStatus::from_u8(self.fault)
    }

    /// Actual position scaled to \[0, 1\].
    pub fn position_normalized(&self) -> f64 {
        self.position as f64 / 255.
    }

    /// Requested position scaled to \[0, 1\].
    pub fn requested_position_normalized(&self) -> f64 {
        self.requested_position as f64 / 255.
    }

    /// Current opening width. Unit: \[m\].
    pub fn width(&self) -> f64 {
        raw_position_to_width(self.position)
    }

    /// Opening width the gripper is moving to. Unit: \[m\].
    pub fn requested_width(&self) -> f64 {
        raw_position_to_width(self.requested_position)
    }

    /// Angle of the left knuckle joint, 0 when open. Unit: \[rad\].
    pub fn knuckle_angle(&self) -> f64 {
        (MAX_KNUCKLE_ANGLE - MAX_KNUCKLE_ANGLE / MAX_WIDTH * self.width())
            .clamp(0., MAX_KNUCKLE_ANGLE)
    }

    /// Motor current. Unit: \[A\].
    pub fn current_amps(&self) -> f64 {
        self.current as f64 * 0.01
    }
}

/// Converts a raw position register value into an opening width in meters.
pub fn raw_position_to_width(raw: u8) -> f64 {
    (MAX_WIDTH / (RAW_OPEN - RAW_CLOSED) * (raw as f64 - RAW_CLOSED)).clamp(0., MAX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: u8, activated: bool, go_to: bool, object: u8) -> GripperState {
        GripperState {
            activated,
            go_to,
            status,
            object,
            ..Default::default()
        }
    }

    #[test]
    fn default_state_is_reset() {
        let state = GripperState::default();
        assert!(state.is_reset());
        assert!(!state.is_ready());
        assert!(!state.is_moving());
        assert_eq!(state.fault_status(), Some(FaultStatus::NoFault));
    }

    #[test]
    fn ready_requires_activation_bit_and_phase() {
        assert!(state(3, true, false, 0).is_ready());
        assert!(!state(3, false, false, 0).is_ready());
        assert!(!state(1, true, false, 0).is_ready());
        assert!(state(3, false, false, 0).is_reset());
    }

    #[test]
    fn moving_and_stopped_are_decoded_independently() {
        // in motion
        let s = state(3, true, true, 0);
        assert!(s.is_moving());
        assert!(!s.is_stopped());
        // go-to cleared but fingers not yet at rest: neither moving nor stopped
        let s = state(3, true, false, 0);
        assert!(!s.is_moving());
        assert!(!s.is_stopped());
        // stopped on an object
        let s = state(3, true, true, 2);
        assert!(!s.is_moving());
        assert!(s.is_stopped());
        assert!(s.object_detected());
        // at the requested position, nothing in between
        let s = state(3, true, true, 3);
        assert!(s.is_stopped());
        assert!(!s.object_detected());
    }

    #[test]
    fn unknown_fault_codes_are_kept_raw() {
        let s = GripperState {
            fault: 0x03,
            ..Default::default()
        };
        assert_eq!(s.fault, 0x03);
        assert_eq!(s.fault_status(), None);
        let s = GripperState {
            fault: 0x0E,
            ..Default::default()
        };
        assert_eq!(s.fault_status(), Some(FaultStatus::OverCurrent));
    }

    #[test]
    fn width_follows_the_finger_stroke() {
        assert!((raw_position_to_width(3) - MAX_WIDTH).abs() < 1e-12);
        assert_eq!(raw_position_to_width(230), 0.);
        assert_eq!(raw_position_to_width(255), 0.);
        assert_eq!(raw_position_to_width(0), MAX_WIDTH);
        let open = GripperState {
            position: 3,
            ..Default::default()
        };
        assert!(open.knuckle_angle().abs() < 1e-12);
        let closed = GripperState {
            position: 230,
            ..Default::default()
        };
        assert!((closed.knuckle_angle() - MAX_KNUCKLE_ANGLE).abs() < 1e-12);
    }

    #[test]
    fn current_in_amps() {
        let s = GripperState {
            current: 50,
            ..Default::default()
        };
        assert!((s.current_amps() - 0.5).abs() < 1e-12);
    }
}
