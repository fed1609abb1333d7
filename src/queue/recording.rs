use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::QueueError;
use crate::queue::JobPublisher;

/// Test double remembering every published job id.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<String>>,
    /// Publishes accepted before the queue reports itself closed.
    capacity: Option<usize>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose queue is already closed.
    pub fn closed() -> Self {
        Self::closing_after(0)
    }

    /// A publisher that accepts `accepted` messages, then fails every publish.
    pub fn closing_after(accepted: usize) -> Self {
        Self {
            published: Mutex::default(),
            capacity: Some(accepted),
        }
    }

    pub async fn published(&self) -> Vec<String> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl JobPublisher for RecordingPublisher {
    async fn publish(&self, job_id: &str) -> Result<(), QueueError> {
        let mut published = self.published.lock().await;
        if self.capacity.is_some_and(|capacity| published.len() >= capacity) {
            return Err(QueueError::Closed);
        }
        published.push(job_id.to_string());
        Ok(())
    }
}
