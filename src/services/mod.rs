//! Runnable services, one per role

pub mod consumer;
pub mod producer;

mod lifecycle;
mod options;

pub use options::SharedOptions;

use crate::library::communication::implementation::redis::{RedisBroker, RedisFactory};
use anyhow::{Context, Result};
use std::sync::Arc;

fn connect(shared_options: &SharedOptions) -> Result<Arc<RedisBroker>> {
    let factory = RedisFactory::new(&shared_options.redis, shared_options.password.clone())
        .with_context(|| format!("invalid redis url {:?}", shared_options.redis))?;

    Ok(Arc::new(RedisBroker::new(factory)))
}
