use std::sync::Arc;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::db::JobLedger;
use crate::error::LedgerError;
use crate::queue::JobPublisher;
use crate::worker::JobConsumer;

/// Pulls messages off the in-process queue and hands each to the consumer
/// on its own task.
pub struct Dispatcher {
    consumer: Arc<JobConsumer>,
    semaphore: Arc<Semaphore>,
    max_concurrent_jobs: usize,
}

impl Dispatcher {
    pub fn new(consumer: Arc<JobConsumer>, max_concurrent_jobs: usize) -> Self {
        Self {
            consumer,
            semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            max_concurrent_jobs,
        }
    }

    /// Run the dispatch loop with semaphore-based bounded concurrency
    ///
    /// # Concurrency Model
    /// - A permit is acquired before a message is taken off the queue, so at
    ///   most `max_concurrent_jobs` messages are in flight
    /// - Each message is handled on a spawned task that releases its permit
    ///   when the job finishes
    /// - On shutdown the loop stops receiving and waits for every permit to
    ///   come back; messages still queued stay `QUEUED` in the ledger and are
    ///   republished on the next start
    pub async fn run(
        self,
        mut receiver: mpsc::Receiver<Vec<u8>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            "Dispatcher started with {} concurrent job slots",
            self.max_concurrent_jobs
        );

        loop {
            let stopping = *shutdown_rx.borrow();
            if stopping {
                break;
            }

            let permit = tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Dispatcher failed to acquire semaphore: {:?}", e);
                        break;
                    }
                },
            };

            let payload = tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                message = receiver.recv() => match message {
                    Some(payload) => payload,
                    None => {
                        info!("Queue closed, dispatcher stopping");
                        break;
                    }
                },
            };

            let consumer = self.consumer.clone();
            tokio::spawn(async move {
                match consumer.handle(&payload).await {
                    Ok(outcome) => debug!("Message handled: {:?}", outcome),
                    Err(e) => error!("Message could not be handled: {}", e),
                }
                // Permit is released here, freeing a slot for the next message
                drop(permit);
            });
        }

        info!("Waiting for in-flight jobs to finish...");
        let slots = u32::try_from(self.max_concurrent_jobs).unwrap_or(u32::MAX);
        match self.semaphore.acquire_many(slots).await {
            Ok(_) => info!("Dispatcher stopped, no jobs in flight"),
            Err(e) => error!("Failed to wait for in-flight jobs: {:?}", e),
        }
    }
}

/// Republishes every job left `QUEUED` or `PROCESSING`, e.g. by a crash.
/// Returns how many were republished.
pub async fn requeue_unfinished(
    ledger: &dyn JobLedger,
    publisher: &dyn JobPublisher,
) -> Result<usize, LedgerError> {
    let unfinished = ledger.list_unfinished().await?;
    let mut republished = 0;
    for job in unfinished {
        match publisher.publish(&job.id).await {
            Ok(()) => republished += 1,
            Err(e) => warn!("Could not republish job {}: {}", job.id, e),
        }
    }
    if republished > 0 {
        info!("Republished {} unfinished jobs", republished);
    }
    Ok(republished)
}
