use redis::aio::{Connection, MultiplexedConnection};
use redis::{Client, IntoConnectionInfo, RedisResult};

/// Factory for redis connections of different kinds
///
/// - [`owned`](RedisFactory::owned) connections are exclusive to one user and may be used for
///   long-running, blocking commands like `XREADGROUP ... BLOCK` without disturbing anybody else.
/// - [`multiplexed`](RedisFactory::multiplexed) connections can be cloned and shared between
///   multiple users but must not be used for blocking commands.
pub struct RedisFactory {
    client: Client,
}

impl RedisFactory {
    /// Creates a new factory opening connections to the given URL
    ///
    /// A non-empty `password` takes precedence over one embedded in the URL.
    pub fn new(url: &str, password: Option<String>) -> RedisResult<Self> {
        let mut info = url.into_connection_info()?;

        if let Some(password) = password.filter(|p| !p.is_empty()) {
            info.redis.password = Some(password);
        }

        Ok(Self {
            client: Client::open(info)?,
        })
    }

    /// Establishes a new dedicated connection
    pub async fn owned(&self) -> RedisResult<Connection> {
        self.client.get_async_connection().await
    }

    /// Establishes a new connection which can be cloned cheaply
    pub async fn multiplexed(&self) -> RedisResult<MultiplexedConnection> {
        self.client.get_multiplexed_tokio_connection().await
    }
}
