use async_trait::async_trait;

use crate::error::LedgerError;
use crate::jobs::{Checkpoint, Completion, Job, NewJob};

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Job),
    /// A job with the same id already existed; it is returned unchanged.
    Existing(Job),
}

impl CreateOutcome {
    pub fn job(&self) -> &Job {
        match self {
            CreateOutcome::Created(job) | CreateOutcome::Existing(job) => job,
        }
    }
}

/// Durable record of every job.
///
/// Every mutation after creation is a single conditional write guarded on
/// the current state, so redelivered messages never move a finished job.
#[async_trait]
pub trait JobLedger: Send + Sync {
    async fn create_if_absent(&self, job: NewJob) -> Result<CreateOutcome, LedgerError>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>, LedgerError>;

    /// Moves a `QUEUED` or `PROCESSING` job to `PROCESSING` at `checkpoint`.
    /// Returns `None` when the job is absent or already terminal.
    async fn begin_processing(
        &self,
        job_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<Option<Job>, LedgerError>;

    /// Records progress on a `PROCESSING` job. Progress never decreases.
    async fn checkpoint(&self, job_id: &str, checkpoint: Checkpoint) -> Result<bool, LedgerError>;

    /// Marks a non-terminal job `COMPLETED`. Returns `false` if nothing changed.
    async fn complete(&self, job_id: &str, completion: Completion) -> Result<bool, LedgerError>;

    /// Marks a non-terminal job `FAILED`. Returns `false` if nothing changed.
    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError>;

    /// Jobs still `QUEUED` or `PROCESSING`, oldest first.
    async fn list_unfinished(&self) -> Result<Vec<Job>, LedgerError>;

    async fn ping(&self) -> Result<(), LedgerError>;

    async fn close(&self) {}
}
