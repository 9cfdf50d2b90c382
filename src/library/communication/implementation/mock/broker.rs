use crate::library::communication::event::{
    Broker, BrokerError, ConsumerGroupDescriptor, Fields, QueueLocation, Record, RecordId,
    StreamBatch,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::time::{sleep, timeout_at, Instant};

#[derive(Default)]
struct MockGroup {
    last_delivered: RecordId,
    pending: HashMap<RecordId, String>,
}

#[derive(Default)]
struct MockStream {
    last_id: RecordId,
    entries: BTreeMap<RecordId, Fields>,
    groups: HashMap<String, MockGroup>,
}

/// In-memory [`Broker`] with consumer group semantics and failure injection
#[derive(Default)]
pub struct MockBroker {
    streams: Mutex<HashMap<String, MockStream>>,
    appended: Notify,
    unreachable: AtomicBool,
    failing_appends: AtomicUsize,
    failing_reads: AtomicUsize,
    reads: AtomicUsize,
    appends: AtomicUsize,
    ack_override: Mutex<Option<usize>>,
    append_delay: Mutex<Duration>,
}

impl MockBroker {
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes every subsequent ack report `count` without touching the pending entries
    pub fn override_ack_count(&self, count: Option<usize>) {
        *self.ack_override.lock().unwrap() = count;
    }

    pub fn set_append_delay(&self, delay: Duration) {
        *self.append_delay.lock().unwrap() = delay;
    }

    /// Number of group reads that have been issued
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of appends that have been started, including failed ones
    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn records(&self, stream: &str) -> Vec<Record> {
        self.streams
            .lock()
            .unwrap()
            .get(stream)
            .map(|s| {
                s.entries
                    .iter()
                    .map(|(id, fields)| Record::new(*id, fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pending deliveries of a group sorted by record id
    pub fn pending(&self, stream: &str, group: &str) -> Vec<(RecordId, String)> {
        let streams = self.streams.lock().unwrap();
        let mut pending: Vec<(RecordId, String)> = streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map(|g| {
                g.pending
                    .iter()
                    .map(|(id, member)| (*id, member.clone()))
                    .collect()
            })
            .unwrap_or_default();

        pending.sort();
        pending
    }

    pub fn last_delivered(&self, stream: &str, group: &str) -> Option<RecordId> {
        self.streams
            .lock()
            .unwrap()
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.last_delivered)
    }

    fn check_reachable(&self) -> Result<(), BrokerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(BrokerError::Unreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn claim(
        &self,
        group: &str,
        member: &str,
        streams: &[String],
        count: usize,
    ) -> Result<Vec<StreamBatch>, BrokerError> {
        let mut state = self.streams.lock().unwrap();

        for stream in streams {
            let known = state
                .get(stream)
                .map(|s| s.groups.contains_key(group))
                .unwrap_or(false);

            if !known {
                return Err(BrokerError::NoGroup {
                    stream: stream.to_owned(),
                    group: group.to_owned(),
                });
            }
        }

        let mut batches = Vec::new();

        for stream in streams {
            if let Some(s) = state.get_mut(stream) {
                if let Some(g) = s.groups.get_mut(group) {
                    let records: Vec<Record> = s
                        .entries
                        .range(g.last_delivered..)
                        .filter(|(id, _)| **id > g.last_delivered)
                        .take(count)
                        .map(|(id, fields)| Record::new(*id, fields.clone()))
                        .collect();

                    for record in records.iter() {
                        g.pending.insert(record.id, member.to_owned());
                    }

                    if let Some(last) = records.last() {
                        g.last_delivered = last.id;
                        batches.push(StreamBatch {
                            stream: stream.to_owned(),
                            records,
                        });
                    }
                }
            }
        }

        Ok(batches)
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn ping(&self) -> Result<(), BrokerError> {
        self.check_reachable()
    }

    async fn append(&self, stream: &str, fields: &Fields) -> Result<RecordId, BrokerError> {
        self.check_reachable()?;
        self.appends.fetch_add(1, Ordering::SeqCst);

        let delay = *self.append_delay.lock().unwrap();
        if delay > Duration::from_millis(0) {
            sleep(delay).await;
        }

        if MockBroker::take_failure(&self.failing_appends) {
            return Err(BrokerError::Backend("injected append failure".into()));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let id = {
            let mut state = self.streams.lock().unwrap();
            let s = state.entry(stream.to_owned()).or_default();
            let id = s.last_id.successor(now);
            s.last_id = id;
            s.entries.insert(id, fields.clone());
            id
        };

        self.appended.notify_waiters();

        Ok(id)
    }

    async fn ensure_group(
        &self,
        stream: &str,
        group: &ConsumerGroupDescriptor,
    ) -> Result<(), BrokerError> {
        self.check_reachable()?;

        let mut state = self.streams.lock().unwrap();
        let s = state.entry(stream.to_owned()).or_default();

        if s.groups.contains_key(group.identifier()) {
            return Err(BrokerError::GroupExists {
                stream: stream.to_owned(),
                group: group.identifier().to_owned(),
            });
        }

        let last_delivered = match group.start() {
            QueueLocation::Head => RecordId::default(),
            QueueLocation::Tail => s.last_id,
        };

        s.groups.insert(
            group.identifier().to_owned(),
            MockGroup {
                last_delivered,
                pending: HashMap::new(),
            },
        );

        Ok(())
    }

    async fn read_group(
        &self,
        group: &str,
        member: &str,
        streams: &[String],
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamBatch>, BrokerError> {
        self.check_reachable()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        if MockBroker::take_failure(&self.failing_reads) {
            return Err(BrokerError::Backend("injected read failure".into()));
        }

        let deadline = if block == Duration::from_millis(0) {
            None
        } else {
            Some(Instant::now() + block)
        };

        loop {
            let notified = self.appended.notified();
            let batches = self.claim(group, member, streams, count)?;

            if !batches.is_empty() {
                return Ok(batches);
            }

            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        return Err(BrokerError::Timeout);
                    }
                }
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, id: &RecordId) -> Result<usize, BrokerError> {
        self.check_reachable()?;

        if let Some(count) = *self.ack_override.lock().unwrap() {
            return Ok(count);
        }

        let mut state = self.streams.lock().unwrap();
        let removed = state
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
            .and_then(|g| g.pending.remove(id));

        Ok(if removed.is_some() { 1 } else { 0 })
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::task::{spawn, yield_now};

    fn fields(value: &str) -> Fields {
        vec![("field1".to_string(), value.to_string())]
    }

    fn tail(group: &str) -> ConsumerGroupDescriptor {
        ConsumerGroupDescriptor::new(group.to_string(), QueueLocation::Tail)
    }

    fn streams(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn assign_increasing_ids() {
        let broker = MockBroker::default();

        let first = broker.append("orders", &fields("a")).await.unwrap();
        let second = broker.append("orders", &fields("b")).await.unwrap();

        assert!(first < second);
        assert_eq!(broker.records("orders").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_records_appended_before_group_creation() {
        let broker = MockBroker::default();
        broker.append("orders", &fields("old")).await.unwrap();
        broker.ensure_group("orders", &tail("g1")).await.unwrap();

        let result = broker
            .read_group("g1", "c1", &streams(&["orders"]), 10, Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(BrokerError::Timeout)));

        let id = broker.append("orders", &fields("new")).await.unwrap();
        let batches = broker
            .read_group("g1", "c1", &streams(&["orders"]), 10, Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records, vec![Record::new(id, fields("new"))]);
    }

    #[tokio::test]
    async fn keep_cursor_when_group_exists() {
        let broker = MockBroker::default();
        broker.ensure_group("orders", &tail("g1")).await.unwrap();
        let id = broker.append("orders", &fields("a")).await.unwrap();

        let result = broker.ensure_group("orders", &tail("g1")).await;

        assert!(matches!(result, Err(BrokerError::GroupExists { .. })));
        assert_eq!(broker.last_delivered("orders", "g1"), Some(RecordId::default()));

        let batches = broker
            .read_group("g1", "c1", &streams(&["orders"]), 1, Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(batches[0].records[0].id, id);
    }

    #[tokio::test]
    async fn deliver_each_record_to_one_member() {
        let broker = MockBroker::default();
        broker.ensure_group("orders", &tail("g1")).await.unwrap();
        let first = broker.append("orders", &fields("a")).await.unwrap();
        let second = broker.append("orders", &fields("b")).await.unwrap();

        let to_c1 = broker
            .read_group("g1", "c1", &streams(&["orders"]), 1, Duration::from_millis(0))
            .await
            .unwrap();
        let to_c2 = broker
            .read_group("g1", "c2", &streams(&["orders"]), 1, Duration::from_millis(0))
            .await
            .unwrap();

        assert_eq!(to_c1[0].records[0].id, first);
        assert_eq!(to_c2[0].records[0].id, second);
        assert_eq!(
            broker.pending("orders", "g1"),
            vec![(first, "c1".to_string()), (second, "c2".to_string())]
        );
    }

    #[tokio::test]
    async fn acknowledge_once() {
        let broker = MockBroker::default();
        broker.ensure_group("orders", &tail("g1")).await.unwrap();
        let id = broker.append("orders", &fields("a")).await.unwrap();
        broker
            .read_group("g1", "c1", &streams(&["orders"]), 1, Duration::from_millis(0))
            .await
            .unwrap();

        assert_eq!(broker.ack("orders", "g1", &id).await.unwrap(), 1);
        assert_eq!(broker.ack("orders", "g1", &id).await.unwrap(), 0);
        assert!(broker.pending("orders", "g1").is_empty());
    }

    #[tokio::test]
    async fn reject_reads_without_group() {
        let broker = MockBroker::default();
        broker.ensure_group("orders", &tail("g1")).await.unwrap();

        let result = broker
            .read_group(
                "g1",
                "c1",
                &streams(&["orders", "invoices"]),
                1,
                Duration::from_millis(0),
            )
            .await;

        assert!(matches!(result, Err(BrokerError::NoGroup { .. })));
    }

    #[tokio::test]
    async fn wake_blocked_reads_on_append() {
        let broker = Arc::new(MockBroker::default());
        broker.ensure_group("orders", &tail("g1")).await.unwrap();

        let reader = broker.clone();
        let handle = spawn(async move {
            reader
                .read_group("g1", "c1", &streams(&["orders"]), 1, Duration::from_millis(0))
                .await
        });

        while broker.reads() == 0 {
            yield_now().await;
        }

        let id = broker.append("orders", &fields("a")).await.unwrap();
        let batches = handle.await.unwrap().unwrap();

        assert_eq!(batches[0].records[0].id, id);
    }
}
