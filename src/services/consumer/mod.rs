//! Processes records from one or more streams as a member of a consumer group

use super::lifecycle::termination_signal;
use super::{connect, SharedOptions};
use crate::library::communication::event::{Consumer, ConsumerConfig, SimulatedProcessor};
use crate::library::helpers::{instance_name, parse_millis};
use anyhow::Result;
use log::info;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Processes records from one or more streams as a member of a consumer group
///
/// On startup the group is created on every stream, starting with records appended from then on.
/// Each delivered record is processed and acknowledged before the next one is read. Any broker
/// error other than a read timeout terminates the process.
pub struct Options {
    /// Consumer name, defaults to a name derived from the start time
    #[structopt(short, long)]
    name: Option<String>,

    /// Name of the consumer group
    #[structopt(short, long, env = "GROUP")]
    group: String,

    /// Time it takes to process a record in milliseconds
    #[structopt(short, long, default_value = "1000", parse(try_from_str = parse_millis))]
    time: Duration,

    /// How long a read may block in milliseconds, zero blocks indefinitely
    #[structopt(short, long, default_value = "0", parse(try_from_str = parse_millis))]
    block: Duration,

    /// Terminate when a read times out instead of reading again
    #[structopt(long)]
    no_skip_timeout: bool,

    /// Streams to read from
    #[structopt(required = true, min_values = 1)]
    streams: Vec<String>,
}

/// Runs the service until a fatal error occurs or the process is asked to terminate
pub async fn run(shared_options: SharedOptions, options: Options) -> Result<()> {
    let broker = connect(&shared_options)?;

    let name = options.name.unwrap_or_else(|| instance_name("Consumer"));
    let mut config = ConsumerConfig::new(options.group, name, options.streams);
    config.block = options.block;
    config.skip_timeout = !options.no_skip_timeout;

    let consumer = Consumer::new(broker, SimulatedProcessor::new(options.time), config);
    consumer.ensure_groups().await;

    tokio::select! {
        Err(e) = consumer.run() => Err(e.into()),
        _ = termination_signal() => {
            info!("Terminated due to external signal");
            Ok(())
        }
    }
}
