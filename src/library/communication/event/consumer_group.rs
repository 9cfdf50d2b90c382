/// Location within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLocation {
    /// Start of the stream, every record ever appended will be delivered
    Head,
    /// End of the stream (exclusive of the last record), only records appended later will be delivered
    Tail,
}

/// Definition of a consumer group
///
/// In a stream, a group of consumers collaborates to consume records.
/// Each record is only delivered to one consumer within the same group, identified
/// by its name. When it is created, the group starts delivering records
/// from the provided [`QueueLocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupDescriptor {
    identifier: String,
    start: QueueLocation,
}

impl ConsumerGroupDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(identifier: String, start: QueueLocation) -> Self {
        Self { identifier, start }
    }

    /// Unique identifier of the group
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Location from where a consumer group begins to consume records
    ///
    /// Note that this is not honored when the group already exists!
    pub fn start(&self) -> QueueLocation {
        self.start
    }
}

/// Unique identifier of a consumer within a [`ConsumerGroup`](ConsumerGroupDescriptor)
pub type ConsumerIdentifier = String;
