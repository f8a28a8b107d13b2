// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Blocking start-up and goal execution on top of [`GripperFleet`].
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::exception::{GripperException, GripperResult};
use crate::gripper::gripper_state::MAX_WIDTH;
use crate::gripper::register_map::{MAX_FORCE, MAX_SPEED, MIN_FORCE, MIN_SPEED};
use crate::gripper::types::{ActuationIntent, Intent};
use crate::gripper::GripperFleet;

/// Timing and tolerances for [`GripperFleet::start_up`] and [`GripperFleet::execute_goal`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GoalConfig {
    /// Give up on a goal or on activation after this long.
    pub timeout: Duration,
    /// A goal counts as reached within this distance. Unit: \[m\].
    pub position_tolerance: f64,
    /// Finger speed used for all goals. Unit: \[m/s\].
    pub gripper_speed: f64,
    /// Time between two polls of the gripper.
    pub poll_period: Duration,
    /// How long the gripper is held in reset before it is activated.
    pub reset_period: Duration,
}

impl Default for GoalConfig {
    fn default() -> Self {
        GoalConfig {
            timeout: Duration::from_secs(2),
            position_tolerance: 0.005,
            gripper_speed: 0.0565,
            poll_period: Duration::from_millis(10),
            reset_period: Duration::from_millis(500),
        }
    }
}

/// Where the fingers should go and how hard they may push.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct GripperGoal {
    /// Opening width. Unit: \[m\].
    pub position: f64,
    /// Grip force. Unit: \[N\].
    pub max_effort: f64,
}

impl GripperGoal {
    pub fn new(position: f64, max_effort: f64) -> Self {
        GripperGoal {
            position,
            max_effort,
        }
    }
}

/// Outcome of [`GripperFleet::execute_goal`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct GoalFeedback {
    /// Opening width at the last successful poll. Unit: \[m\].
    pub position: f64,
    /// The fingers came to rest.
    pub stalled: bool,
    /// Within tolerance of the goal, or holding an object.
    pub reached_goal: bool,
}

impl<C: Channel> GripperFleet<C> {
    /// Resets gripper `dev`, activates it and waits until it reports ready.
    /// The activation is repeated until the gripper acknowledges it.
    /// # Return
    /// True if the gripper became ready before the timeout, false otherwise.
    /// # Errors
    /// * [`BoundsError`](`crate::exception::GripperException::BoundsError`) if `dev` is not part of the fleet.
    /// * [`ClosedError`](`crate::exception::GripperException::ClosedError`) after [`shutdown`](`Self::shutdown`).
    pub fn start_up(&mut self, dev: usize, config: Option<&GoalConfig>) -> GripperResult<bool> {
        let default_config = GoalConfig::default();
        let config = config.unwrap_or(&default_config);
        log::info!("gripper {}: start up", dev);
        tolerate(self.try_command(dev, &Intent::Deactivate))?;
        sleep(config.reset_period);

        let mut acknowledged = false;
        let start = Instant::now();
        while start.elapsed() < config.timeout {
            if !acknowledged {
                acknowledged = tolerate(self.try_command(dev, &Intent::Activate))?.is_some();
            }
            if acknowledged
                && tolerate(self.try_query_status(dev))?.is_some()
                && self.is_ready(dev)
            {
                log::info!("gripper {}: ready for commands", dev);
                return Ok(true);
            }
            sleep(config.poll_period);
        }
        log::warn!("gripper {}: not ready after {:?}", dev, config.timeout);
        Ok(false)
    }

    /// Moves gripper `dev` to `goal` and polls it until the goal is reached, an object is
    /// held, or the timeout elapses. Failed exchanges are retried on the next poll.
    ///
    /// The goal is clamped to the stroke, speed and force range of the gripper.
    /// # Errors
    /// * [`BoundsError`](`crate::exception::GripperException::BoundsError`) if `dev` is not part of the fleet.
    /// * [`ClosedError`](`crate::exception::GripperException::ClosedError`) after [`shutdown`](`Self::shutdown`).
    pub fn execute_goal(
        &mut self,
        dev: usize,
        goal: &GripperGoal,
        config: Option<&GoalConfig>,
    ) -> GripperResult<GoalFeedback> {
        let default_config = GoalConfig::default();
        let config = config.unwrap_or(&default_config);
        let position = goal.position.clamp(0., MAX_WIDTH);
        let force = goal.max_effort.clamp(MIN_FORCE, MAX_FORCE);
        let speed = config.gripper_speed.clamp(MIN_SPEED, MAX_SPEED);
        log::info!(
            "gripper {}: goal width {} m, force {} N",
            dev,
            position,
            force
        );
        let intent = Intent::Goto(ActuationIntent::from_metric(position, speed, force));

        let mut feedback = GoalFeedback::default();
        let start = Instant::now();
        loop {
            if start.elapsed() >= config.timeout {
                log::warn!("gripper {}: goal timeout reached", dev);
                break;
            }
            let acknowledged = tolerate(self.try_command(dev, &intent))?.is_some();
            let polled = tolerate(self.try_query_status(dev))?;
            if let (true, Some(state)) = (acknowledged, polled) {
                feedback.position = state.width();
                feedback.stalled = state.is_stopped();
                feedback.reached_goal = (position - feedback.position).abs()
                    < config.position_tolerance
                    || state.object_detected();
                if feedback.reached_goal {
                    log::info!("gripper {}: goal reached at {} m", dev, feedback.position);
                    break;
                }
            }
            sleep(config.poll_period);
        }
        Ok(feedback)
    }
}

/// Passes bus failures on as `None`. Bounds and lifecycle errors cannot heal by retrying.
fn tolerate<T>(result: GripperResult<T>) -> GripperResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error @ GripperException::BoundsError { .. })
        | Err(error @ GripperException::ClosedError) => Err(error),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gripper::mock_bus::MockBus;
    use crate::gripper::types::control_bits::{ACTIVATE, GO_TO};

    fn fast_config() -> GoalConfig {
        GoalConfig {
            timeout: Duration::from_millis(200),
            poll_period: Duration::from_millis(0),
            reset_period: Duration::from_millis(0),
            ..Default::default()
        }
    }

    fn bus_of(fleet: &GripperFleet<MockBus>) -> &MockBus {
        match fleet.lifecycle() {
            crate::gripper::Lifecycle::Open(bus) => bus,
            crate::gripper::Lifecycle::Closed => panic!("fleet closed"),
        }
    }

    #[test]
    fn start_up_waits_for_activation() {
        let mut bus = MockBus::new(1);
        bus.set_activation_polls(0, 3);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        assert_eq!(fleet.start_up(0, Some(&fast_config())), Ok(true));
        assert!(fleet.is_ready(0));
        assert_eq!(bus_of(&fleet).control(0), ACTIVATE);
        // deactivate, activate, two polls while activating, one ready poll
        assert_eq!(bus_of(&fleet).writes(), 5);
    }

    #[test]
    fn start_up_repeats_a_lost_activation() {
        let mut bus = MockBus::new(1);
        // the deactivation goes through, the first activation does not
        bus.fail_attempt(2);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        assert_eq!(fleet.start_up(0, Some(&fast_config())), Ok(true));
        assert!(fleet.is_ready(0));
        assert_eq!(bus_of(&fleet).control(0), ACTIVATE);
        assert_eq!(bus_of(&fleet).writes(), 3);
    }

    #[test]
    fn start_up_gives_up_on_a_silent_bus() {
        let mut bus = MockBus::new(1);
        bus.fail_writes(true);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        let config = GoalConfig {
            timeout: Duration::from_millis(20),
            ..fast_config()
        };
        assert_eq!(fleet.start_up(0, Some(&config)), Ok(false));
        assert!(!fleet.is_ready(0));
    }

    #[test]
    fn start_up_rejects_unknown_devices() {
        let mut fleet = GripperFleet::with_channel(MockBus::new(1), 1, None);
        assert_eq!(
            fleet.start_up(1, Some(&fast_config())),
            Err(GripperException::BoundsError {
                device: 1,
                count: 1
            })
        );
    }

    #[test]
    fn goal_is_reached_within_tolerance() {
        let mut bus = MockBus::new(1);
        bus.set_max_step(0, 20);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        assert_eq!(fleet.start_up(0, Some(&fast_config())), Ok(true));
        let feedback = fleet
            .execute_goal(0, &GripperGoal::new(0.03, 50.), Some(&fast_config()))
            .unwrap();
        assert!(feedback.reached_goal);
        assert!((feedback.position - 0.03).abs() < 0.005);
        assert_eq!(bus_of(&fleet).control(0), ACTIVATE | GO_TO);
    }

    #[test]
    fn goal_ends_on_object_contact() {
        let mut bus = MockBus::new(1);
        bus.place_object(0, 120);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        let feedback = fleet
            .execute_goal(0, &GripperGoal::new(0., 100.), Some(&fast_config()))
            .unwrap();
        assert!(feedback.reached_goal);
        assert!(feedback.stalled);
        assert!(fleet.object_detected(0));
        assert!(feedback.position > 0.03);
    }

    #[test]
    fn goal_is_clamped_to_the_stroke() {
        let mut fleet = GripperFleet::with_channel(MockBus::new(1), 1, None);
        let feedback = fleet
            .execute_goal(0, &GripperGoal::new(0.5, 1000.), Some(&fast_config()))
            .unwrap();
        assert!(feedback.reached_goal);
        assert_eq!(bus_of(&fleet).requested(0), 3);
    }

    #[test]
    fn goal_times_out_when_the_fingers_do_not_arrive() {
        let mut bus = MockBus::new(1);
        bus.set_max_step(0, 1);
        let mut fleet = GripperFleet::with_channel(bus, 1, None);
        let config = GoalConfig {
            timeout: Duration::from_millis(30),
            poll_period: Duration::from_millis(10),
            ..fast_config()
        };
        let feedback = fleet
            .execute_goal(0, &GripperGoal::new(0., 100.), Some(&config))
            .unwrap();
        assert!(!feedback.reached_goal);
        assert!(!feedback.stalled);
    }

    #[test]
    fn goal_on_closed_fleet_fails() {
        let mut fleet = GripperFleet::with_channel(MockBus::new(1), 1, None);
        fleet.shutdown();
        assert_eq!(
            fleet.execute_goal(0, &GripperGoal::new(0.01, 100.), None),
            Err(GripperException::ClosedError)
        );
    }
}
