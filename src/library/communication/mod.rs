//! Structures to exchange records between services through a shared broker
//!
//! Producers and consumers never talk to each other directly. A producer appends records to a named
//! stream and whoever is interested reads them through a consumer group. For more details consult the
//! [`event`] module, concrete broker implementations live in [`implementation`].

pub mod event;
pub mod implementation;
