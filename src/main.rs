use anyhow::Result;
use structopt::StructOpt;

use streamgroup::services::*;

#[derive(Debug, StructOpt)]
#[structopt(about = "At-least-once record exchange over Redis Streams consumer groups.")]
struct MainOptions {
    #[structopt(flatten)]
    shared_options: SharedOptions,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    Producer(producer::Options),
    Consumer(consumer::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    let main_options = MainOptions::from_args();
    let shared_options = main_options.shared_options;

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&shared_options.log)
        .init();

    log::info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match main_options.cmd {
        Command::Producer(options) => producer::run(shared_options, options).await?,
        Command::Consumer(options) => consumer::run(shared_options, options).await?,
    }

    Ok(())
}
