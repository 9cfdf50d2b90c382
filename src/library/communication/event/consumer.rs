use super::{
    Broker, BrokerError, ConsumerGroupDescriptor, ConsumerIdentifier, Processor, QueueLocation,
    Record,
};
use log::{debug, error, info, trace, warn};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of records claimed per stream in one read cycle
const RECORDS_PER_CYCLE: usize = 1;

/// Errors which terminate a [`Consumer`]
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Read timed out while timeouts are not skipped
    #[error("no records arrived within {0:?}")]
    Timeout(Duration),
    /// Broker failed while reading from the group
    #[error("failed to read from consumer group {group:?}: {source}")]
    Read {
        /// Group that was read from
        group: String,
        /// Underlying broker error
        source: BrokerError,
    },
}

/// Settings of a [`Consumer`]
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Name of the consumer group
    pub group: String,
    /// Name of this member within the group
    pub member: ConsumerIdentifier,
    /// Streams that are read from
    pub streams: Vec<String>,
    /// How long a read may block while waiting for new records, zero blocks indefinitely
    pub block: Duration,
    /// Whether a read timeout simply starts the next cycle instead of terminating the consumer
    pub skip_timeout: bool,
}

impl ConsumerConfig {
    /// Creates a new configuration which blocks indefinitely and skips timeouts
    pub fn new(group: String, member: ConsumerIdentifier, streams: Vec<String>) -> Self {
        Self {
            group,
            member,
            streams,
            block: Duration::from_millis(0),
            skip_timeout: true,
        }
    }
}

/// Result of a single read-process-acknowledge cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Read timed out and the timeout was skipped
    Idle,
    /// Records have been delivered to this member
    Delivered {
        /// Number of delivered records
        delivered: usize,
        /// Number of records that have been processed and acknowledged
        acknowledged: usize,
    },
}

/// Member of a consumer group which processes and acknowledges records one cycle at a time
///
/// Every cycle claims at most one new record per stream, processes the claimed records in order
/// and acknowledges each one before the next read is issued.
pub struct Consumer<B, P> {
    broker: Arc<B>,
    processor: P,
    config: ConsumerConfig,
}

impl<B, P> Consumer<B, P>
where
    B: Broker + Send + Sync,
    P: Processor + Send + Sync,
{
    /// Creates a new instance which uses the given broker and processor
    pub fn new(broker: Arc<B>, processor: P, config: ConsumerConfig) -> Self {
        Self {
            broker,
            processor,
            config,
        }
    }

    /// Creates the consumer group on every configured stream and returns how many were created
    ///
    /// New groups only receive records appended after their creation. Existing groups keep their
    /// position. Failures are logged and do not prevent the remaining streams from being set up.
    pub async fn ensure_groups(&self) -> usize {
        let descriptor =
            ConsumerGroupDescriptor::new(self.config.group.clone(), QueueLocation::Tail);
        let mut created = 0;

        for stream in self.config.streams.iter() {
            match self.broker.ensure_group(stream, &descriptor).await {
                Ok(()) => {
                    info!("Created group {:?} on stream {:?}", self.config.group, stream);
                    created += 1;
                }
                Err(e @ BrokerError::GroupExists { .. }) => info!("{}, keeping its position", e),
                Err(e) => warn!(
                    "Error creating group {:?} on stream {:?}: {}",
                    self.config.group, stream, e
                ),
            }
        }

        created
    }

    /// Reads, processes and acknowledges records until an unrecoverable error occurs
    pub async fn run(&self) -> Result<Infallible, ConsumerError> {
        loop {
            self.cycle().await?;
        }
    }

    /// Executes a single read-process-acknowledge cycle
    pub async fn cycle(&self) -> Result<CycleOutcome, ConsumerError> {
        let read = self
            .broker
            .read_group(
                &self.config.group,
                &self.config.member,
                &self.config.streams,
                RECORDS_PER_CYCLE,
                self.config.block,
            )
            .await;

        let batches = match read {
            Ok(batches) => batches,
            Err(BrokerError::Timeout) if self.config.skip_timeout => {
                trace!("Read timed out, retrying");
                return Ok(CycleOutcome::Idle);
            }
            Err(BrokerError::Timeout) => return Err(ConsumerError::Timeout(self.config.block)),
            Err(source) => {
                return Err(ConsumerError::Read {
                    group: self.config.group.clone(),
                    source,
                })
            }
        };

        let mut delivered = 0;
        let mut acknowledged = 0;

        for batch in batches.iter() {
            for record in batch.records.iter() {
                delivered += 1;

                if self.handle(&batch.stream, record).await {
                    acknowledged += 1;
                }
            }
        }

        Ok(CycleOutcome::Delivered {
            delivered,
            acknowledged,
        })
    }

    /// Processes and acknowledges a record, returns whether both succeeded
    async fn handle(&self, stream: &str, record: &Record) -> bool {
        info!(
            "Group: {}, Consumer: {}, Stream: {}, ID: {}, Values: {:?}",
            self.config.group, self.config.member, stream, record.id, record.fields
        );

        if let Err(e) = self.processor.process(stream, record).await {
            warn!("Failed to process {} from {}: {}", record.id, stream, e);
            return false;
        }

        match self.broker.ack(stream, &self.config.group, &record.id).await {
            Ok(1) => {
                debug!("Acknowledged {} on {}", record.id, stream);
                true
            }
            Ok(count) => {
                error!(
                    "Error acknowledging {} on {}: broker acknowledged {} records",
                    record.id, stream, count
                );
                false
            }
            Err(e) => {
                error!("Error acknowledging {} on {}: {}", record.id, stream, e);
                false
            }
        }
    }
}
