use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::QueueError;
use crate::queue::{JobMessage, JobPublisher};

/// In-process queue: a bounded channel carrying encoded [`JobMessage`]s.
pub fn channel(capacity: usize) -> (ChannelPublisher, mpsc::Receiver<Vec<u8>>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ChannelPublisher { sender }, receiver)
}

#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<Vec<u8>>,
}

#[async_trait]
impl JobPublisher for ChannelPublisher {
    async fn publish(&self, job_id: &str) -> Result<(), QueueError> {
        let payload = JobMessage::new(job_id).encode()?;
        self.sender
            .send(payload)
            .await
            .map_err(|_| QueueError::Closed)?;
        debug!("Published message for job {}", job_id);
        Ok(())
    }
}
