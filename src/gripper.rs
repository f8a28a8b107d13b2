// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//!  Contains the robotiq::GripperFleet type.

use crate::channel::{Channel, ChannelConfig, SerialChannel};
use crate::exception::{create_channel_exception, GripperException, GripperResult};
use crate::gripper::gripper_state::GripperState;
use crate::gripper::logger::{Record, DEFAULT_LOG_SIZE};
use crate::gripper::session::DeviceSession;
use crate::gripper::types::{Intent, MAX_GRIPPERS};

pub mod frame_codec;
pub mod goal;
pub mod gripper_state;
pub mod logger;
#[cfg(test)]
mod mock_bus;
pub mod register_map;
pub mod session;
pub mod types;

/// Whether a fleet still owns its bus.
pub enum Lifecycle<C> {
    Open(C),
    /// The channel was dropped by [`GripperFleet::shutdown`]. There is no way back.
    Closed,
}

impl<C> Lifecycle<C> {
    pub fn is_open(&self) -> bool {
        matches!(self, Lifecycle::Open(_))
    }
}

/// All grippers sharing one serial bus, addressed by device index.
///
/// The fleet exclusively owns the channel and lends it to one session at a time. Callers that
/// share a fleet between threads have to put it behind a single mutex.
///
/// Every accessor checks the lifecycle and the device index first. An index outside
/// `0..len()` or a closed fleet yields `false`/`0`, and never affects the other grippers.
pub struct GripperFleet<C: Channel = SerialChannel> {
    lifecycle: Lifecycle<C>,
    sessions: Vec<DeviceSession>,
}

impl GripperFleet<SerialChannel> {
    /// Opens the serial port and creates one session per gripper.
    /// # Errors
    /// * [`ChannelError`](`crate::exception::GripperException::ChannelError`) if the port cannot be opened
    /// or more than [`MAX_GRIPPERS`] grippers are configured.
    pub fn open(config: &ChannelConfig) -> GripperResult<Self> {
        if config.num_grippers > MAX_GRIPPERS {
            return Err(create_channel_exception(
                "too many grippers, unit ids would leave the Modbus address range",
            ));
        }
        let channel = SerialChannel::open(config)?;
        Ok(GripperFleet::with_channel(channel, config.num_grippers, None))
    }
}

impl<C: Channel> GripperFleet<C> {
    /// Creates a fleet of `num_grippers` sessions on top of an already opened channel.
    ///
    /// At most [`MAX_GRIPPERS`] sessions are created. Indices beyond have no unit id and are
    /// treated like any other index outside `0..len()`.
    /// # Arguments
    /// * `log_size` - exchanges kept per gripper, defaults to [`DEFAULT_LOG_SIZE`].
    pub fn with_channel(channel: C, num_grippers: usize, log_size: Option<usize>) -> Self {
        let log_size = log_size.unwrap_or(DEFAULT_LOG_SIZE);
        let sessions: Vec<DeviceSession> = (0..num_grippers)
            .map_while(|device| DeviceSession::new(device, log_size).ok())
            .collect();
        if sessions.len() < num_grippers {
            log::warn!(
                "only {} of {} grippers fit on one bus",
                sessions.len(),
                num_grippers
            );
        }
        GripperFleet {
            lifecycle: Lifecycle::Open(channel),
            sessions,
        }
    }

    /// Number of grippers in the fleet.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True for a fleet without grippers.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The channel while the fleet is open.
    pub fn lifecycle(&self) -> &Lifecycle<C> {
        &self.lifecycle
    }

    /// Sends `intent` to gripper `dev` and waits for the acknowledgment.
    /// # Errors
    /// * [`ClosedError`](`crate::exception::GripperException::ClosedError`) after [`shutdown`](`Self::shutdown`).
    /// * [`BoundsError`](`crate::exception::GripperException::BoundsError`) if `dev` is not part of the fleet.
    /// * everything [`DeviceSession::try_send_action`] returns.
    pub fn try_command(&mut self, dev: usize, intent: &Intent) -> GripperResult<()> {
        let (channel, session) = self.route(dev)?;
        session.try_send_action(channel, intent)
    }

    /// Reads the status of gripper `dev` into its cached state.
    /// # Errors
    /// Same as [`try_command`](`Self::try_command`).
    pub fn try_query_status(&mut self, dev: usize) -> GripperResult<GripperState> {
        let (channel, session) = self.route(dev)?;
        session.try_send_status_request(channel)
    }

    /// True if the gripper acknowledged the command.
    pub fn command(&mut self, dev: usize, intent: &Intent) -> bool {
        self.try_command(dev, intent).is_ok()
    }

    /// True if a valid status was received and cached.
    pub fn query_status(&mut self, dev: usize) -> bool {
        self.try_query_status(dev).is_ok()
    }

    /// Sets the activation bit of gripper `dev`. The fingers open and close once to calibrate.
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn activate(&mut self, dev: usize) -> bool {
        self.command(dev, &Intent::Activate)
    }

    /// Clears the activation bit of gripper `dev`, which resets it.
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn deactivate(&mut self, dev: usize) -> bool {
        self.command(dev, &Intent::Deactivate)
    }

    /// Moves the fingers. All arguments are normalized to \[0, 1\], 0 being open.
    /// # Arguments
    /// * `pos` - Requested position, 0 is fully open and 1 fully closed.
    /// * `vel` - Finger speed, 1 is the fastest.
    /// * `force` - Grip force, 1 is the strongest.
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn goto(&mut self, dev: usize, pos: f64, vel: f64, force: f64) -> bool {
        self.command(dev, &Intent::goto(pos, vel, force))
    }

    /// Stops a running move of gripper `dev` by clearing the go-to bit.
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn stop(&mut self, dev: usize) -> bool {
        self.command(dev, &Intent::Stop)
    }

    /// Starts the automatic release of gripper `dev`. The fingers move to the end of their stroke
    /// slowly, regardless of other commands, until the release is cleared.
    /// # Arguments
    /// * `open_gripper` - Release by opening (true) or by closing (false).
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn activate_emergency_release(&mut self, dev: usize, open_gripper: bool) -> bool {
        self.command(
            dev,
            &Intent::EmergencyRelease {
                open: open_gripper,
            },
        )
    }

    /// Ends the automatic release of gripper `dev`. Other control bits stay as they were.
    /// # Return
    /// True if the gripper acknowledged the command, false otherwise.
    pub fn deactivate_emergency_release(&mut self, dev: usize) -> bool {
        self.command(dev, &Intent::ClearEmergencyRelease)
    }

    /// Last known state of gripper `dev`, `None` for a bad index or a closed fleet.
    pub fn state(&self, dev: usize) -> Option<GripperState> {
        self.snapshot(dev).copied()
    }

    /// True if gripper `dev` finished its activation and accepts moves.
    /// Based on the last successful [`query_status`](`Self::query_status`), like all accessors below.
    pub fn is_ready(&self, dev: usize) -> bool {
        self.snapshot(dev).map_or(false, GripperState::is_ready)
    }

    /// True if gripper `dev` is in reset or not activated.
    pub fn is_reset(&self, dev: usize) -> bool {
        self.snapshot(dev).map_or(false, GripperState::is_reset)
    }

    /// True while the fingers of gripper `dev` travel towards the requested position.
    pub fn is_moving(&self, dev: usize) -> bool {
        self.snapshot(dev).map_or(false, GripperState::is_moving)
    }

    /// True if the fingers of gripper `dev` came to rest, at an object or at the requested position.
    pub fn is_stopped(&self, dev: usize) -> bool {
        self.snapshot(dev).map_or(false, GripperState::is_stopped)
    }

    /// True if the fingers of gripper `dev` stopped on an object while opening or closing.
    pub fn object_detected(&self, dev: usize) -> bool {
        self.snapshot(dev).map_or(false, GripperState::object_detected)
    }

    /// Raw gFLT code.
    pub fn get_fault_status(&self, dev: usize) -> u8 {
        self.snapshot(dev).map_or(0, |s| s.fault)
    }

    /// Raw position register, 0 (open) to 255 (closed).
    pub fn get_pos(&self, dev: usize) -> u8 {
        self.snapshot(dev).map_or(0, |s| s.position)
    }

    /// Raw echo of the requested position, 0 (open) to 255 (closed).
    pub fn get_req_pos(&self, dev: usize) -> u8 {
        self.snapshot(dev).map_or(0, |s| s.requested_position)
    }

    /// Raw motor current register, about 10 mA per count.
    pub fn get_current(&self, dev: usize) -> u8 {
        self.snapshot(dev).map_or(0, |s| s.current)
    }

    /// Position in the same unit as [`Intent::goto`], i.e. raw / 255.
    pub fn get_pos_normalized(&self, dev: usize) -> f64 {
        self.snapshot(dev)
            .map_or(0., GripperState::position_normalized)
    }

    /// Requested position as raw / 255.
    pub fn get_req_pos_normalized(&self, dev: usize) -> f64 {
        self.snapshot(dev)
            .map_or(0., GripperState::requested_position_normalized)
    }

    /// Opening width. Unit: \[m\].
    pub fn get_width(&self, dev: usize) -> f64 {
        self.snapshot(dev).map_or(0., GripperState::width)
    }

    /// Why the last exchange with gripper `dev` failed, if it did.
    pub fn last_error(&self, dev: usize) -> Option<GripperException> {
        self.sessions.get(dev)?.last_error().cloned()
    }

    /// Recorded exchanges of gripper `dev`, oldest first. Clears the record.
    pub fn flush_log(&mut self, dev: usize) -> Vec<Record> {
        self.sessions
            .get_mut(dev)
            .map(DeviceSession::flush_log)
            .unwrap_or_default()
    }

    /// Closes every session and the channel. Later operations return their failure value
    /// without touching the bus. Calling it twice is harmless.
    pub fn shutdown(&mut self) {
        if self.lifecycle.is_open() {
            log::info!("shutting down {} gripper session(s)", self.sessions.len());
        }
        for session in self.sessions.iter_mut() {
            session.shutdown();
        }
        self.lifecycle = Lifecycle::Closed;
    }

    fn snapshot(&self, dev: usize) -> Option<&GripperState> {
        if !self.lifecycle.is_open() {
            return None;
        }
        self.sessions.get(dev).map(DeviceSession::gripper_state)
    }

    fn route(&mut self, dev: usize) -> GripperResult<(&mut C, &mut DeviceSession)> {
        let count = self.sessions.len();
        let channel = match &mut self.lifecycle {
            Lifecycle::Open(channel) => channel,
            Lifecycle::Closed => return Err(GripperException::ClosedError),
        };
        let session = self
            .sessions
            .get_mut(dev)
            .ok_or(GripperException::BoundsError { device: dev, count })?;
        Ok((channel, session))
    }
}
