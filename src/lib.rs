// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # robotiq-rs
//! robotiq-rs is a library to control [Robotiq](https://robotiq.com) 2F-85 grippers
//! which share one RS-485 bus and speak Modbus RTU.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE OPERATING THE GRIPPER!**
//!
//! ## Design
//! The library is divided into three main Modules:
//! * [channel](`crate::channel`) - the serial transport shared by all grippers.
//! * [gripper](`crate::gripper`) - frames, registers, one session per gripper and the fleet on top.
//! * [exception](`crate::exception`) - the error type returned by every fallible call.
//!
//! Gripper `n` on the bus answers to unit id `9 + n`. A [`GripperFleet`] owns the channel and
//! routes every request to the session of the addressed gripper.
//!
//! # Example:
//!```no_run
//! use robotiq::{ChannelConfig, GripperFleet, GripperGoal, GripperResult};
//! fn main() -> GripperResult<()> {
//!     let mut fleet = GripperFleet::open(&ChannelConfig::new("/dev/ttyUSB0"))?;
//!     if !fleet.start_up(0, None)? {
//!         eprintln!("gripper did not become ready");
//!         return Ok(());
//!     }
//!     let feedback = fleet.execute_goal(0, &GripperGoal::new(0.02, 60.), None)?;
//!     println!("fingers stopped at {} m", feedback.position);
//!     fleet.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! The main function returns a GripperResult<()> which means that it returns either Ok(())
//! or an Error of type GripperException.
//!
//! Below the goal interface, commands and status polls can be issued one by one:
//!```no_run
//! # use robotiq::{ChannelConfig, GripperFleet, GripperResult};
//! # fn main() -> GripperResult<()> {
//! # let mut fleet = GripperFleet::open(&ChannelConfig::new("/dev/ttyUSB0"))?;
//! fleet.activate(0);
//! fleet.goto(0, 0.5, 1., 0.2);
//! if fleet.query_status(0) {
//!     println!("position {} of 255, moving: {}", fleet.get_pos(0), fleet.is_moving(0));
//! }
//! # Ok(())
//! # }
//! ```
//! The accessors never fail. An unknown gripper index, a closed fleet or a failed exchange
//! show up as `false` or `0`. Use [`GripperFleet::try_command`] and
//! [`GripperFleet::try_query_status`] to see the reason.
pub mod channel;
pub mod exception;
pub mod gripper;

pub use channel::{Channel, ChannelConfig, SerialChannel};
pub use exception::{ErrorKind, GripperException, GripperResult};
pub use gripper::goal::{GoalConfig, GoalFeedback, GripperGoal};
pub use gripper::gripper_state::GripperState;
pub use gripper::session::{DeviceSession, SessionState};
pub use gripper::types::{ActuationIntent, Intent};
pub use gripper::{GripperFleet, Lifecycle};
