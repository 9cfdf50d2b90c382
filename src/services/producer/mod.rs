//! Periodically appends records to a stream

use super::lifecycle::termination_signal;
use super::{connect, SharedOptions};
use crate::library::communication::event::{Fields, Producer, ProducerConfig};
use crate::library::helpers::{instance_name, parse_field, parse_millis};
use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Periodically appends records to a stream
///
/// Every tick appends one record built from the given fields. Sends that fail are logged and
/// not retried.
pub struct Options {
    /// Producer name, defaults to a name derived from the start time
    #[structopt(short, long)]
    name: Option<String>,

    /// Stream to which records are appended
    #[structopt(short, long, env = "STREAM")]
    stream: String,

    /// Interval between two sends in milliseconds
    #[structopt(short, long, default_value = "2000", parse(try_from_str = parse_millis))]
    time: Duration,

    /// Maximum number of sends that may be in flight at once, further ticks are skipped
    #[structopt(long, default_value = "1")]
    max_in_flight: usize,

    /// Record field in the form key=value, may be repeated
    ///
    /// Defaults to field1=message1 field2=message2
    #[structopt(short, long = "field", parse(try_from_str = parse_field))]
    fields: Vec<(String, String)>,
}

fn default_fields() -> Fields {
    vec![
        ("field1".to_string(), "message1".to_string()),
        ("field2".to_string(), "message2".to_string()),
    ]
}

/// Runs the service until a fatal error occurs or the process is asked to terminate
pub async fn run(shared_options: SharedOptions, options: Options) -> Result<()> {
    let broker = connect(&shared_options)?;

    let name = options.name.unwrap_or_else(|| instance_name("Producer"));
    let mut config = ProducerConfig::new(name, options.stream);
    config.interval = options.time;
    config.max_in_flight = options.max_in_flight;

    let producer = Arc::new(Producer::new(broker, config));
    producer.health_check().await?;
    info!("Connected to Redis at {}", shared_options.redis);

    let fields = if options.fields.is_empty() {
        default_fields()
    } else {
        options.fields
    };

    tokio::select! {
        _ = producer.run(fields) => {},
        _ = termination_signal() => info!("Terminated due to external signal"),
    }

    Ok(())
}
