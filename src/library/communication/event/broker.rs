use super::super::super::BoxedError;
use super::{ConsumerGroupDescriptor, Fields, RecordId, StreamBatch};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`Broker`]
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Nothing arrived before the block duration of a group read elapsed
    #[error("no records arrived before the block timeout elapsed")]
    Timeout,
    /// Group creation was requested for a group that already exists
    #[error("consumer group {group:?} already exists on stream {stream:?}")]
    GroupExists {
        /// Stream on which the group exists
        stream: String,
        /// Name of the group
        group: String,
    },
    /// Group is not known for a stream
    #[error("consumer group {group:?} does not exist on stream {stream:?}")]
    NoGroup {
        /// Stream which has been read or acknowledged
        stream: String,
        /// Name of the missing group
        group: String,
    },
    /// Broker could not be reached
    #[error("broker is unreachable")]
    Unreachable(#[source] BoxedError),
    /// Broker replied with something that does not fit the expected shape
    #[error("broker returned a malformed reply: {0}")]
    MalformedReply(String),
    /// Any other error reported by the broker implementation
    #[error("broker operation failed")]
    Backend(#[source] BoxedError),
}

/// Durable, append-only log of streams with consumer group bookkeeping
///
/// Implementations have to be safe for concurrent use by multiple producers and consumers
/// without external locking. Conflicting operations are serialized by the broker itself.
#[async_trait]
pub trait Broker {
    /// Verifies that the broker is reachable
    async fn ping(&self) -> Result<(), BrokerError>;

    /// Appends a new record to a stream, creating the stream if necessary, and returns its identifier
    async fn append(&self, stream: &str, fields: &Fields) -> Result<RecordId, BrokerError>;

    /// Creates a consumer group on a stream, creating the stream if necessary
    ///
    /// Fails with [`BrokerError::GroupExists`] if the group already exists, in which case its
    /// position is left untouched.
    async fn ensure_group(
        &self,
        stream: &str,
        group: &ConsumerGroupDescriptor,
    ) -> Result<(), BrokerError>;

    /// Claims records that have never been delivered to any member of the group
    ///
    /// Returns at most `count` records per stream. Blocks until at least one record is available
    /// or `block` elapses, in which case [`BrokerError::Timeout`] is returned. A zero `block`
    /// duration waits indefinitely. Every returned record is pending for `member` until acknowledged.
    async fn read_group(
        &self,
        group: &str,
        member: &str,
        streams: &[String],
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamBatch>, BrokerError>;

    /// Marks a delivered record as processed and returns the number of records that were acknowledged
    async fn ack(&self, stream: &str, group: &str, id: &RecordId) -> Result<usize, BrokerError>;
}
