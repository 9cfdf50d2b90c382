use super::super::super::EmptyResult;
use super::Record;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Side-effecting step that is executed for every delivered [`Record`] before it is acknowledged
#[async_trait]
pub trait Processor {
    /// Processes a record and returns whether it succeeded or failed
    ///
    /// Records for which an error is returned are not acknowledged and remain pending.
    async fn process(&self, stream: &str, record: &Record) -> EmptyResult;
}

/// Processor which does nothing but wait for a fixed amount of time
pub struct SimulatedProcessor {
    delay: Duration,
}

impl SimulatedProcessor {
    /// Creates a new instance which takes `delay` to process each record
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Processor for SimulatedProcessor {
    async fn process(&self, _stream: &str, _record: &Record) -> EmptyResult {
        sleep(self.delay).await;
        Ok(())
    }
}
