// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use clap::Parser;
use robotiq::gripper::gripper_state::MAX_WIDTH;
use robotiq::{ChannelConfig, GripperFleet, GripperGoal, GripperResult};
use std::time::Duration;

/// An example showing how to grasp an object with a 2F-85 gripper.
#[derive(Parser, Debug)]
#[clap(author, version, name = "grasp_object")]
struct CommandLineArguments {
    /// Serial port the gripper is connected to, e.g. /dev/ttyUSB0
    pub port: String,
    /// Width of the object in meter
    pub object_width: f64,
    /// Grasping force in Newton
    #[clap(long, default_value_t = 60.)]
    pub force: f64,
    /// Device index of the gripper on the bus
    #[clap(long, default_value_t = 0)]
    pub device: usize,
}

fn main() -> GripperResult<()> {
    env_logger::init();
    let args: CommandLineArguments = CommandLineArguments::parse();
    if args.object_width > MAX_WIDTH {
        eprintln!("Object is too large for the gripper.");
        std::process::exit(-1);
    }
    let config = ChannelConfig {
        num_grippers: args.device + 1,
        ..ChannelConfig::new(args.port.as_str())
    };
    let mut fleet = GripperFleet::open(&config)?;
    if !fleet.start_up(args.device, None)? {
        eprintln!("Gripper did not finish its activation.");
        std::process::exit(-1);
    }
    fleet.execute_goal(args.device, &GripperGoal::new(MAX_WIDTH, args.force), None)?;
    // aim slightly inside the object so the fingers close on it
    let goal = GripperGoal::new((args.object_width - 0.01).max(0.), args.force);
    let feedback = fleet.execute_goal(args.device, &goal, None)?;
    std::thread::sleep(Duration::from_secs(3));
    fleet.query_status(args.device);
    if !feedback.stalled || !fleet.object_detected(args.device) {
        eprintln!("Object lost");
        std::process::exit(-1);
    }
    println!("Grasped object, will release it now.");
    fleet.execute_goal(args.device, &GripperGoal::new(MAX_WIDTH, args.force), None)?;
    fleet.shutdown();
    Ok(())
}
