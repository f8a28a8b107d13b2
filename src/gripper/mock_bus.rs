// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Simulated bus of 2F-85 grippers answering real frames, used by the tests.
use std::collections::VecDeque;
use std::io;

use crate::channel::Channel;
use crate::gripper::frame_codec::{compute_crc, verify};
use crate::gripper::types::control_bits::{ACTIVATE, GO_TO};
use crate::gripper::types::{
    unit_id, ACTION_REQUEST_LEN, READ_HOLDING_REGISTERS, STATUS_PAYLOAD_LEN, STATUS_REQUEST_LEN,
    WRITE_MULTIPLE_REGISTERS,
};

#[derive(Default, Clone)]
struct SimulatedGripper {
    control: u8,
    requested: u8,
    position: u8,
    object_at: Option<u8>,
    activation_polls: usize,
    polls_since_activation: usize,
    max_step: Option<u8>,
    fault: u8,
}

impl SimulatedGripper {
    fn activated(&self) -> bool {
        self.control & ACTIVATE != 0 && self.polls_since_activation >= self.activation_polls
    }

    fn go_to(&self) -> bool {
        self.control & GO_TO != 0
    }

    /// Advances the fingers by one poll and returns the gOBJ code.
    fn step(&mut self) -> u8 {
        if self.control & ACTIVATE == 0 {
            self.polls_since_activation = 0;
            return 0;
        }
        if !self.activated() {
            self.polls_since_activation += 1;
            return 0;
        }
        if !self.go_to() {
            return 0;
        }
        let target = match self.object_at {
            Some(object) if self.requested > object => object,
            _ => self.requested,
        };
        let step = self.max_step.unwrap_or(u8::MAX);
        if self.position < target {
            self.position = self.position.saturating_add(step).min(target);
        } else {
            self.position = self.position.saturating_sub(step).max(target);
        }
        match (self.position == target, self.object_at) {
            (false, _) => 0,
            (true, Some(object)) if self.requested > object => 2,
            (true, _) => 3,
        }
    }

    fn status_byte(&mut self) -> u8 {
        let object = self.step();
        let activated = self.activated();
        let phase = match (self.control & ACTIVATE != 0, activated) {
            (true, true) => 3,
            (true, false) => 1,
            _ => 0,
        };
        (self.control & ACTIVATE) | (self.control & GO_TO) | (phase << 4) | (object << 6)
    }
}

/// A bus with `n` grippers. Requests with a wrong CRC or an unknown unit id go unanswered.
pub(crate) struct MockBus {
    grippers: Vec<SimulatedGripper>,
    pending: VecDeque<u8>,
    truncate_to: Option<usize>,
    corrupt: bool,
    fail_writes: bool,
    fail_attempt: Option<usize>,
    attempts: usize,
    writes: usize,
}

impl MockBus {
    pub fn new(n: usize) -> Self {
        MockBus {
            grippers: vec![SimulatedGripper::default(); n],
            pending: VecDeque::new(),
            truncate_to: None,
            corrupt: false,
            fail_writes: false,
            fail_attempt: None,
            attempts: 0,
            writes: 0,
        }
    }

    /// Only the first `len` bytes of the next response arrive.
    pub fn truncate_next_response(&mut self, len: usize) {
        self.truncate_to = Some(len);
    }

    /// Flips a bit inside the next response.
    pub fn corrupt_next_response(&mut self) {
        self.corrupt = true;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Only the `attempt`-th write from now on fails, counting from 1.
    pub fn fail_attempt(&mut self, attempt: usize) {
        self.fail_attempt = Some(self.attempts + attempt);
    }

    /// Fingers of `device` stop on an object at raw position `at` while closing.
    pub fn place_object(&mut self, device: usize, at: u8) {
        self.grippers[device].object_at = Some(at);
    }

    /// Number of status polls `device` needs before it reports completed activation.
    pub fn set_activation_polls(&mut self, device: usize, polls: usize) {
        self.grippers[device].activation_polls = polls;
    }

    /// Limits how far the fingers of `device` move per status poll.
    pub fn set_max_step(&mut self, device: usize, step: u8) {
        self.grippers[device].max_step = Some(step);
    }

    pub fn set_fault(&mut self, device: usize, fault: u8) {
        self.grippers[device].fault = fault;
    }

    /// Control byte as last received by `device`.
    pub fn control(&self, device: usize) -> u8 {
        self.grippers[device].control
    }

    pub fn requested(&self, device: usize) -> u8 {
        self.grippers[device].requested
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    fn device_for(&self, unit: u8) -> Option<usize> {
        (0..self.grippers.len()).find(|device| unit_id(*device) == Some(unit))
    }

    fn respond(&mut self, body: &[u8]) {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&compute_crc(body).to_le_bytes());
        if let Some(len) = self.truncate_to.take() {
            frame.truncate(len);
        }
        if self.corrupt {
            self.corrupt = false;
            let middle = frame.len() / 2;
            frame[middle] ^= 0x10;
        }
        self.pending.extend(frame);
    }
}

impl Channel for MockBus {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.attempts += 1;
        if self.fail_writes || self.fail_attempt == Some(self.attempts) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "bus unplugged"));
        }
        self.writes += 1;
        self.pending.clear();
        if !verify(frame) {
            return Ok(());
        }
        let device = match self.device_for(frame[0]) {
            Some(device) => device,
            None => return Ok(()),
        };
        match (frame[1], frame.len()) {
            (WRITE_MULTIPLE_REGISTERS, ACTION_REQUEST_LEN) => {
                let gripper = &mut self.grippers[device];
                gripper.control = frame[7];
                gripper.requested = frame[10];
                self.respond(&frame[..6]);
            }
            (READ_HOLDING_REGISTERS, STATUS_REQUEST_LEN) => {
                let gripper = &mut self.grippers[device];
                let mut body = vec![frame[0], READ_HOLDING_REGISTERS, STATUS_PAYLOAD_LEN as u8];
                let mut registers = [0u8; STATUS_PAYLOAD_LEN];
                registers[0] = gripper.status_byte();
                registers[2] = gripper.fault;
                registers[3] = gripper.requested;
                registers[4] = gripper.position;
                registers[5] = if gripper.go_to() { 40 } else { 0 };
                body.extend_from_slice(&registers);
                self.respond(&body);
            }
            _ => {}
        }
        Ok(())
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let n = buffer.len().min(self.pending.len());
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
