use super::reply::parse_read_reply;
use super::{
    RedisFactory, ERROR_CODE_BUSYGROUP, ERROR_CODE_NOGROUP, STREAM_ID_ADDITIONS, STREAM_ID_HEAD,
    STREAM_ID_NEW, STREAM_ID_TAIL,
};
use crate::library::communication::event::{
    Broker, BrokerError, ConsumerGroupDescriptor, Fields, QueueLocation, RecordId, StreamBatch,
};
use async_trait::async_trait;
use futures::lock::Mutex;
use log::debug;
use redis::aio::{Connection, MultiplexedConnection};
use redis::streams::StreamReadOptions;
use redis::{AsyncCommands, RedisError, Value};
use std::convert::TryInto;
use std::time::Duration;

/// Broker implementation using [Redis Streams](https://redis.io/topics/streams-intro)
///
/// Short commands (`XADD`, `XGROUP`, `XACK`) share one multiplexed connection while every concurrent
/// blocking `XREADGROUP` gets a dedicated connection from a small pool so that readers never stall
/// other users of the broker.
pub struct RedisBroker {
    factory: RedisFactory,
    shared: Mutex<Option<MultiplexedConnection>>,
    readers: Mutex<Vec<Connection>>,
}

impl RedisBroker {
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: RedisFactory) -> Self {
        Self {
            factory,
            shared: Mutex::new(None),
            readers: Mutex::new(Vec::new()),
        }
    }

    async fn shared(&self) -> Result<MultiplexedConnection, BrokerError> {
        let mut shared = self.shared.lock().await;

        if let Some(con) = shared.as_ref() {
            return Ok(con.clone());
        }

        debug!("Opening shared redis connection");
        let con = self.factory.multiplexed().await.map_err(broker_error)?;
        *shared = Some(con.clone());

        Ok(con)
    }

    async fn reader(&self) -> Result<Connection, BrokerError> {
        if let Some(con) = self.readers.lock().await.pop() {
            return Ok(con);
        }

        debug!("Opening dedicated redis connection for blocking reads");
        self.factory.owned().await.map_err(broker_error)
    }

    async fn return_reader(&self, con: Connection) {
        self.readers.lock().await.push(con);
    }

    /// Drops the shared connection if it turned out to be unusable so that the next command reconnects
    async fn observe<T>(&self, result: Result<T, BrokerError>) -> Result<T, BrokerError> {
        if let Err(BrokerError::Unreachable(_)) = result {
            *self.shared.lock().await = None;
        }

        result
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn ping(&self) -> Result<(), BrokerError> {
        let mut con = self.shared().await?;
        let response: String = self
            .observe(
                redis::cmd("PING")
                    .query_async::<_, String>(&mut con)
                    .await
                    .map_err(broker_error),
            )
            .await?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(BrokerError::Unreachable(
                format!("unexpected PING response {:?}", response).into(),
            ))
        }
    }

    async fn append(&self, stream: &str, fields: &Fields) -> Result<RecordId, BrokerError> {
        let mut con = self.shared().await?;

        let result = con
            .xadd::<_, _, _, _, String>(stream, STREAM_ID_NEW, &fields[..])
            .await
            .map_err(broker_error);
        let id: String = self.observe(result).await?;

        id.parse()
            .map_err(|e| BrokerError::MalformedReply(format!("{}", e)))
    }

    async fn ensure_group(
        &self,
        stream: &str,
        group: &ConsumerGroupDescriptor,
    ) -> Result<(), BrokerError> {
        let start_id = match group.start() {
            QueueLocation::Head => STREAM_ID_HEAD,
            QueueLocation::Tail => STREAM_ID_TAIL,
        };

        let mut con = self.shared().await?;

        let result = con
            .xgroup_create_mkstream::<_, _, _, ()>(stream, group.identifier(), start_id)
            .await
            .map_err(|e| classify(e, stream, group.identifier()));

        self.observe(result).await
    }

    async fn read_group(
        &self,
        group: &str,
        member: &str,
        streams: &[String],
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamBatch>, BrokerError> {
        let options = StreamReadOptions::default()
            .group(group, member)
            .count(count)
            .block(block_millis(block));
        let ids = vec![STREAM_ID_ADDITIONS; streams.len()];

        let mut con = self.reader().await?;

        // Connections are only returned to the pool after a clean round-trip
        let reply: Value = con
            .xread_options::<_, _, Value>(streams, &ids[..], &options)
            .await
            .map_err(|e| classify(e, &streams.join(","), group))?;

        self.return_reader(con).await;

        parse_read_reply(reply)
    }

    async fn ack(&self, stream: &str, group: &str, id: &RecordId) -> Result<usize, BrokerError> {
        let mut con = self.shared().await?;

        let result = con
            .xack::<_, _, _, usize>(stream, group, &[id.to_string()])
            .await
            .map_err(broker_error);

        self.observe(result).await
    }
}

fn broker_error(e: RedisError) -> BrokerError {
    if e.is_connection_refusal() || e.is_io_error() || e.is_connection_dropped() {
        BrokerError::Unreachable(Box::new(e))
    } else {
        BrokerError::Backend(Box::new(e))
    }
}

/// Maps consumer group related error codes before falling back to [`broker_error`]
fn classify(e: RedisError, stream: &str, group: &str) -> BrokerError {
    match e.code() {
        Some(ERROR_CODE_BUSYGROUP) => BrokerError::GroupExists {
            stream: stream.to_owned(),
            group: group.to_owned(),
        },
        Some(ERROR_CODE_NOGROUP) => BrokerError::NoGroup {
            stream: stream.to_owned(),
            group: group.to_owned(),
        },
        _ => broker_error(e),
    }
}

/// `BLOCK` argument for a read, zero waits forever so sub-millisecond waits are rounded up
fn block_millis(block: Duration) -> usize {
    if block == Duration::from_millis(0) {
        return 0;
    }

    block.as_millis().try_into().unwrap_or(usize::MAX).max(1)
}
