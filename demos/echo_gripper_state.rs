// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use clap::Parser;
use std::time::Duration;

use robotiq::{ChannelConfig, GripperFleet, GripperResult};

/// An example showing how to continuously read the state of all grippers on a bus.
#[derive(Parser, Debug)]
#[clap(author, version, name = "echo_gripper_state")]
struct CommandLineArguments {
    /// Serial port the grippers are connected to, e.g. /dev/ttyUSB0
    pub port: String,
    /// Number of grippers on the bus
    #[clap(short, long, default_value_t = 1)]
    pub num_grippers: usize,
    /// Number of status polls per gripper
    #[clap(short, long, default_value_t = 100)]
    pub count: usize,
}

fn main() -> GripperResult<()> {
    env_logger::init();
    let args = CommandLineArguments::parse();
    let config = ChannelConfig {
        num_grippers: args.num_grippers,
        ..ChannelConfig::new(args.port.as_str())
    };
    let mut fleet = GripperFleet::open(&config)?;
    for _ in 0..args.count {
        for dev in 0..fleet.len() {
            // reports the failure and continues with the next gripper
            if let Err(error) = fleet.try_query_status(dev) {
                eprintln!("gripper {}: {}", dev, error);
                continue;
            }
            if let Some(state) = fleet.state(dev) {
                println!(
                    "gripper {}: width {:.4} m, current {:.2} A, {:?}",
                    dev,
                    state.width(),
                    state.current_amps(),
                    state
                );
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    fleet.shutdown();
    Ok(())
}
