//! Structures to realise at-least-once record delivery through consumer groups
//!
//! A [`Producer`] appends [`Records`](Record) to a named stream on a [`Broker`]. Streams are
//! append-only logs in which every record receives a strictly increasing [`RecordId`].
//!
//! Records are consumed in a reliable way using a concept called
//! [`ConsumerGroups`](ConsumerGroupDescriptor). Every group tracks the last record it handed out
//! and which of its members currently holds which unacknowledged record. All members of a group
//! collectively process the stream where each record is delivered to only one of them. Groups
//! created by the [`Consumer`] start at the [tail](QueueLocation::Tail) of the stream, records
//! appended before the group existed are never delivered to it.
//!
//! Once a record has been processed it has to be acknowledged. Records that are never acknowledged
//! stay pending within the group indefinitely, they are neither redelivered nor reclaimed.

mod broker;
mod consumer;
mod consumer_group;
mod processor;
mod producer;
mod record;

pub use broker::*;
pub use consumer::*;
pub use consumer_group::*;
pub use processor::*;
pub use producer::*;
pub use record::*;
