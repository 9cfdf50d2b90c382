//! This library crate contains everything required to append records to streams and to consume them
//! reliably through consumer groups.
//!
//! The low-level [`library`] module describes the broker contract together with the producer and consumer
//! roles built on top of it, while the [`services`] module wires these roles into runnable processes.

#![deny(missing_docs)]

pub mod library;
pub mod services;
