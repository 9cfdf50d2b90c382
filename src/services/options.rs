use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Options shared by every service
pub struct SharedOptions {
    /// Redis server URL
    #[structopt(
        short,
        long,
        global = true,
        env,
        default_value = "redis://localhost:6379/",
        value_name = "url"
    )]
    pub redis: String,

    /// Redis password, overrides one embedded in the URL
    #[structopt(long, global = true, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,
}
