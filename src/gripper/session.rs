// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the robotiq::DeviceSession type.
use crate::channel::Channel;
use crate::exception::{GripperException, GripperResult};
use crate::gripper::frame_codec::{encode_action_frame, encode_status_request, validate_response};
use crate::gripper::gripper_state::GripperState;
use crate::gripper::logger::{Logger, Record};
use crate::gripper::register_map::{decode_status, encode_intent};
use crate::gripper::types::{
    unit_id, ActionRegisters, Intent, ACTION_RESPONSE_LEN, MAX_GRIPPERS, STATUS_RESPONSE_LEN,
};

/// Where a session is in its command/response cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    /// A request was written and its response is being read.
    AwaitingResponse,
    /// The last exchange failed. The next command starts a new exchange.
    Faulted(GripperException),
    /// Terminal. No further bytes are exchanged.
    Closed,
}

/// Command/response lifecycle and cached state of one gripper on the bus.
///
/// The session does not own the channel; the fleet lends it for each exchange so that only
/// one exchange can be in flight on the bus.
pub struct DeviceSession {
    device: usize,
    unit_id: u8,
    state: SessionState,
    registers: ActionRegisters,
    gripper_state: GripperState,
    logger: Logger,
}

impl DeviceSession {
    /// Creates a session for the gripper with index `device`.
    /// # Arguments
    /// * `device` - index on the bus, the Modbus unit id is `device + 9`.
    /// * `log_size` - number of exchanges kept for [`flush_log`](`Self::flush_log`).
    /// # Errors
    /// * [`BoundsError`](`crate::exception::GripperException::BoundsError`) if `device` is not below
    /// [`MAX_GRIPPERS`](`crate::gripper::types::MAX_GRIPPERS`).
    pub fn new(device: usize, log_size: usize) -> GripperResult<Self> {
        let unit_id = unit_id(device).ok_or(GripperException::BoundsError {
            device,
            count: MAX_GRIPPERS,
        })?;
        Ok(DeviceSession {
            device,
            unit_id,
            state: SessionState::Idle,
            registers: ActionRegisters::default(),
            gripper_state: GripperState::default(),
            logger: Logger::new(log_size),
        })
    }

    /// Encodes `intent` on top of the last commanded registers, sends it and waits for the
    /// acknowledgment.
    ///
    /// The registers count as commanded once the request is written, even if the
    /// acknowledgment is lost. The cached [`GripperState`] is never touched.
    /// # Errors
    /// * [`ChannelError`](`crate::exception::GripperException::ChannelError`) if writing or reading fails.
    /// * [`FramingError`](`crate::exception::GripperException::FramingError`) if the acknowledgment is not 8 bytes long.
    /// * [`IntegrityError`](`crate::exception::GripperException::IntegrityError`) if its CRC is wrong.
    /// * [`ClosedError`](`crate::exception::GripperException::ClosedError`) after [`shutdown`](`Self::shutdown`).
    pub fn try_send_action<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        intent: &Intent,
    ) -> GripperResult<()> {
        self.check_open()?;
        let registers = encode_intent(intent, &self.registers);
        let request = encode_action_frame(self.unit_id, &registers.to_payload());
        let mut response = [0; ACTION_RESPONSE_LEN];
        self.state = SessionState::AwaitingResponse;
        log::debug!("gripper {}: {:?} -> {:02X?}", self.device, intent, request);
        let (received, outcome) = match channel.write_frame(&request) {
            Ok(()) => {
                self.registers = registers;
                receive(channel, &mut response)
            }
            Err(e) => (0, Err(e.into())),
        };
        self.complete(&request, &response[..received], outcome)
    }

    /// Boolean form of [`try_send_action`](`Self::try_send_action`).
    pub fn send_action<C: Channel + ?Sized>(&mut self, channel: &mut C, intent: &Intent) -> bool {
        self.try_send_action(channel, intent).is_ok()
    }

    /// Reads the status registers and replaces the cached [`GripperState`] on success.
    /// On failure the previous state stays as it was.
    /// # Errors
    /// Same as [`try_send_action`](`Self::try_send_action`), with 21 bytes expected.
    pub fn try_send_status_request<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
    ) -> GripperResult<GripperState> {
        self.check_open()?;
        let request = encode_status_request(self.unit_id);
        let mut response = [0; STATUS_RESPONSE_LEN];
        self.state = SessionState::AwaitingResponse;
        let (received, outcome) = match channel.write_frame(&request) {
            Ok(()) => receive(channel, &mut response),
            Err(e) => (0, Err(e.into())),
        };
        self.complete(&request, &response[..received], outcome)?;
        self.gripper_state = decode_status(&response);
        log::debug!("gripper {}: {:?}", self.device, self.gripper_state);
        Ok(self.gripper_state)
    }

    /// Boolean form of [`try_send_status_request`](`Self::try_send_status_request`).
    pub fn send_status_request<C: Channel + ?Sized>(&mut self, channel: &mut C) -> bool {
        self.try_send_status_request(channel).is_ok()
    }

    /// Closes the session for good. Later sends fail without touching the channel.
    pub fn shutdown(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn device(&self) -> usize {
        self.device
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Last known state of the gripper.
    pub fn gripper_state(&self) -> &GripperState {
        &self.gripper_state
    }

    /// Registers as last written to the gripper.
    pub fn registers(&self) -> ActionRegisters {
        self.registers
    }

    /// The failure of the last exchange, if it failed.
    pub fn last_error(&self) -> Option<&GripperException> {
        match &self.state {
            SessionState::Faulted(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the recorded exchanges oldest first and clears them.
    pub fn flush_log(&mut self) -> Vec<Record> {
        self.logger.flush()
    }

    fn check_open(&self) -> GripperResult<()> {
        match self.state {
            SessionState::Closed => Err(GripperException::ClosedError),
            _ => Ok(()),
        }
    }

    fn complete(
        &mut self,
        request: &[u8],
        response: &[u8],
        outcome: GripperResult<()>,
    ) -> GripperResult<()> {
        self.logger.log(Record::new(request, response, &outcome));
        match &outcome {
            Ok(()) => self.state = SessionState::Idle,
            Err(error) => {
                log::warn!("gripper {}: exchange failed: {}", self.device, error);
                self.state = SessionState::Faulted(error.clone());
            }
        }
        outcome
    }
}

/// Reads the response to a request that was already written and checks length and CRC.
/// Returns how many bytes arrived next to the verdict.
fn receive<C: Channel + ?Sized>(
    channel: &mut C,
    response: &mut [u8],
) -> (usize, GripperResult<()>) {
    match channel.read_frame(response) {
        Ok(received) => {
            let received = received.min(response.len());
            (
                received,
                validate_response(&response[..received], response.len()),
            )
        }
        Err(e) => (0, Err(e.into())),
    }
}
