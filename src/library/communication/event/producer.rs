use super::{Broker, BrokerError, Fields, RecordId};
use log::{error, info, warn};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};

const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
const DEFAULT_MAX_IN_FLIGHT: usize = 1;

/// Errors that may occur while producing records
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Broker did not respond to the health check
    #[error("can not connect to the broker: {0}")]
    Unreachable(#[source] BrokerError),
    /// Appending a record failed
    #[error("failed to append record to stream {stream:?}: {source}")]
    Append {
        /// Target stream
        stream: String,
        /// Underlying broker error
        source: BrokerError,
    },
}

/// Settings of a [`Producer`]
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Name of the producer, used for logging only
    pub name: String,
    /// Stream to which records are appended
    pub stream: String,
    /// Time between two scheduled sends
    pub interval: Duration,
    /// Maximum number of sends that may be outstanding at the same time
    ///
    /// Ticks that occur while this many sends are still in progress are skipped.
    pub max_in_flight: usize,
}

impl ProducerConfig {
    /// Creates a new configuration with default scheduling settings
    pub fn new(name: String, stream: String) -> Self {
        Self {
            name,
            stream,
            interval: DEFAULT_INTERVAL,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Periodically appends records to one stream
pub struct Producer<B> {
    broker: Arc<B>,
    config: ProducerConfig,
}

impl<B> Producer<B>
where
    B: Broker + Send + Sync + 'static,
{
    /// Creates a new instance which uses the given broker
    pub fn new(broker: Arc<B>, config: ProducerConfig) -> Self {
        Self { broker, config }
    }

    /// Verifies that the broker is reachable
    pub async fn health_check(&self) -> Result<(), ProducerError> {
        self.broker
            .ping()
            .await
            .map_err(ProducerError::Unreachable)
    }

    /// Appends a single record to the configured stream
    pub async fn send_message(&self, fields: &Fields) -> Result<RecordId, ProducerError> {
        let id = self
            .broker
            .append(&self.config.stream, fields)
            .await
            .map_err(|source| ProducerError::Append {
                stream: self.config.stream.clone(),
                source,
            })?;

        info!(
            "Producer: {}, Stream: {}, ID: {}, Values: {:?}",
            self.config.name, self.config.stream, id, fields
        );

        Ok(id)
    }

    /// Sends `fields` once every interval until the process terminates
    ///
    /// Each send runs as its own task so that a slow broker does not delay the schedule. Failed
    /// sends are logged and not retried, the next tick is unaffected by them.
    pub async fn run(self: Arc<Self>, fields: Fields) -> Infallible {
        let max_in_flight = self.config.max_in_flight.max(1);
        let permits = Arc::new(Semaphore::new(max_in_flight));
        let fields = Arc::new(fields);

        let mut ticker = interval(self.config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let permit = match permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(
                        "Skipping send to {}, {} sends are still in flight",
                        self.config.stream, max_in_flight
                    );
                    continue;
                }
            };

            let producer = self.clone();
            let fields = fields.clone();

            tokio::spawn(async move {
                if let Err(e) = producer.send_message(&fields).await {
                    error!("{}", e);
                }

                drop(permit);
            });
        }
    }
}
