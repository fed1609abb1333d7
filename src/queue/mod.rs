pub mod channel;
pub mod envelope;
#[cfg(test)]
pub(crate) mod recording;

use async_trait::async_trait;

use crate::error::QueueError;

pub use channel::{channel, ChannelPublisher};
pub use envelope::{extract_job_id, JobMessage};

/// Publishes pointer messages telling a worker which job to process.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, job_id: &str) -> Result<(), QueueError>;
}
