//! Independent and project agnostic libraries
//!
//! Nothing in here knows about command line options or process lifecycles. The roles only talk to an
//! injected [`Broker`](communication::event::Broker) so that they can be driven by the real Redis
//! implementation as well as by in-memory doubles.

pub mod communication;
pub mod helpers;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
