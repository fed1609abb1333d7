use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::ledger::{CreateOutcome, JobLedger};
use crate::error::LedgerError;
use crate::jobs::{Checkpoint, Completion, Job, JobState, NewJob, FAILED_MESSAGE};

/// Process-local job ledger used when no database is configured.
///
/// Jobs do not survive a restart. Each state change is applied under one
/// lock, matching the conditional updates of the Postgres ledger.
#[derive(Default)]
pub struct InMemoryJobLedger {
    jobs: Mutex<HashMap<String, Job>>,
    writes: AtomicUsize,
}

impl InMemoryJobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutations applied so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Moves the job to `next` and applies `apply`, provided the state
    /// machine allows the transition from its current state.
    async fn transition<F>(&self, job_id: &str, next: JobState, apply: F) -> Option<Job>
    where
        F: FnOnce(&mut Job) + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id)
            .filter(|job| job.state.can_transition_to(next))?;
        job.state = next;
        apply(job);
        job.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Some(job.clone())
    }
}

#[async_trait]
impl JobLedger for InMemoryJobLedger {
    async fn create_if_absent(&self, job: NewJob) -> Result<CreateOutcome, LedgerError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(&job.id) {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }
        let created = Job::queued(job, Utc::now());
        jobs.insert(created.id.clone(), created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(CreateOutcome::Created(created))
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, LedgerError> {
        Ok(self.jobs.lock().await.get(job_id).cloned())
    }

    async fn begin_processing(
        &self,
        job_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<Option<Job>, LedgerError> {
        Ok(self
            .transition(job_id, JobState::Processing, |job| {
                job.progress = checkpoint.progress;
                job.status_message = Some(checkpoint.message.to_string());
                job.error = None;
            })
            .await)
    }

    async fn checkpoint(&self, job_id: &str, checkpoint: Checkpoint) -> Result<bool, LedgerError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs
            .get_mut(job_id)
            .filter(|job| job.state == JobState::Processing)
        else {
            return Ok(false);
        };
        job.progress = job.progress.max(checkpoint.progress);
        job.status_message = Some(checkpoint.message.to_string());
        job.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn complete(&self, job_id: &str, completion: Completion) -> Result<bool, LedgerError> {
        Ok(self
            .transition(job_id, JobState::Completed, |job| {
                job.progress = Checkpoint::COMPLETED.progress;
                job.status_message = Some(Checkpoint::COMPLETED.message.to_string());
                job.formatted_text = Some(completion.formatted_text);
                job.result_path = Some(completion.result_path);
                job.result_url = Some(completion.result_url);
                job.text_preserved = Some(completion.text_preserved);
                job.error = None;
            })
            .await
            .is_some())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError> {
        Ok(self
            .transition(job_id, JobState::Failed, |job| {
                job.status_message = Some(FAILED_MESSAGE.to_string());
                job.error = Some(error.to_string());
            })
            .await
            .is_some())
    }

    async fn list_unfinished(&self) -> Result<Vec<Job>, LedgerError> {
        let mut unfinished: Vec<Job> = self
            .jobs
            .lock()
            .await
            .values()
            .filter(|job| JobState::UNFINISHED.contains(&job.state))
            .cloned()
            .collect();
        unfinished.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(unfinished)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}
