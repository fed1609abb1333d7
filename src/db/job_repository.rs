use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::db::ledger::{CreateOutcome, JobLedger};
use crate::db::models::JobRow;
use crate::error::LedgerError;
use crate::jobs::{Checkpoint, Completion, Job, JobState, NewJob, FAILED_MESSAGE};

const JOB_COLUMNS: &str = "id, storage_path, profile_name, owner, state, progress, \
     status_message, formatted_text, result_path, result_url, error, text_preserved, \
     created_at, updated_at";

/// Postgres-backed job ledger
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

}

/// Database spellings of the states a job may leave for `next`. Every
/// conditional update binds these, so the guard is the same one the
/// in-memory ledger applies.
fn states_allowing(next: JobState) -> Vec<&'static str> {
    JobState::predecessors(next)
        .into_iter()
        .map(JobState::as_str)
        .collect()
}

#[async_trait]
impl JobLedger for JobRepository {
    async fn create_if_absent(&self, job: NewJob) -> Result<CreateOutcome, LedgerError> {
        debug!("Creating job: id={}, profile={}", job.id, job.profile_name);

        let query = format!(
            "INSERT INTO jobs (id, storage_path, profile_name, owner, state, progress) \
             VALUES ($1, $2, $3, $4, 'QUEUED', 0) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {}",
            JOB_COLUMNS
        );
        let inserted = sqlx::query_as::<_, JobRow>(&query)
            .bind(&job.id)
            .bind(&job.storage_path)
            .bind(&job.profile_name)
            .bind(&job.owner)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            debug!("Job created with id={}", row.id);
            return Ok(CreateOutcome::Created(Job::try_from(row)?));
        }

        debug!("Job {} already exists", job.id);
        match self.get(&job.id).await? {
            Some(existing) => Ok(CreateOutcome::Existing(existing)),
            None => Err(LedgerError::CorruptRecord {
                job_id: job.id,
                reason: "conflicting row disappeared".to_string(),
            }),
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, LedgerError> {
        let query = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn begin_processing(
        &self,
        job_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<Option<Job>, LedgerError> {
        let query = format!(
            "UPDATE jobs \
             SET state = 'PROCESSING', progress = $2, status_message = $3, \
                 error = NULL, updated_at = NOW() \
             WHERE id = $1 AND state = ANY($4) \
             RETURNING {}",
            JOB_COLUMNS
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .bind(checkpoint.progress)
            .bind(checkpoint.message)
            .bind(states_allowing(JobState::Processing))
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn checkpoint(&self, job_id: &str, checkpoint: Checkpoint) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET progress = GREATEST(progress, $2), status_message = $3, updated_at = NOW() \
             WHERE id = $1 AND state = 'PROCESSING'",
        )
        .bind(job_id)
        .bind(checkpoint.progress)
        .bind(checkpoint.message)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, job_id: &str, completion: Completion) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET state = 'COMPLETED', progress = $2, status_message = $3, \
                 formatted_text = $4, result_path = $5, result_url = $6, \
                 text_preserved = $7, error = NULL, updated_at = NOW() \
             WHERE id = $1 AND state = ANY($8)",
        )
        .bind(job_id)
        .bind(Checkpoint::COMPLETED.progress)
        .bind(Checkpoint::COMPLETED.message)
        .bind(&completion.formatted_text)
        .bind(&completion.result_path)
        .bind(&completion.result_url)
        .bind(completion.text_preserved)
        .bind(states_allowing(JobState::Completed))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError> {
        // The state guard and the write are one statement; a racing
        // completion can never be overwritten.
        let result = sqlx::query(
            "UPDATE jobs \
             SET state = 'FAILED', status_message = $2, error = $3, updated_at = NOW() \
             WHERE id = $1 AND state = ANY($4)",
        )
        .bind(job_id)
        .bind(FAILED_MESSAGE)
        .bind(error)
        .bind(states_allowing(JobState::Failed))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_unfinished(&self) -> Result<Vec<Job>, LedgerError> {
        let query = format!(
            "SELECT {} FROM jobs WHERE state = ANY($1) ORDER BY created_at, id",
            JOB_COLUMNS
        );
        let unfinished: Vec<&str> = JobState::UNFINISHED.iter().map(|s| s.as_str()).collect();
        sqlx::query_as::<_, JobRow>(&query)
            .bind(unfinished)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Job::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::db::{connection, migrations};

    /// Repository over the database named by `DATABASE_URL`, or `None` when
    /// no database is configured for the test run.
    async fn repository() -> Option<JobRepository> {
        let database_url = std::env::var("DATABASE_URL").ok()?;
        let pool = connection::get_connection(&database_url, 2).await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        Some(JobRepository::new(pool))
    }

    async fn queued(repository: &JobRepository) -> String {
        let id = format!("test-{}", Uuid::new_v4());
        let outcome = repository
            .create_if_absent(NewJob {
                id: id.clone(),
                storage_path: "uploads/in.docx".to_string(),
                profile_name: "standard_clean".to_string(),
                owner: "alice".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        id
    }

    fn completion(id: &str) -> Completion {
        Completion {
            formatted_text: "Hello".to_string(),
            result_path: format!("outputs/{}_formatted.docx", id),
            result_url: format!("memory://outputs/{}_formatted.docx", id),
            text_preserved: true,
        }
    }

    #[tokio::test]
    async fn test_fail_after_complete_is_refused() {
        let Some(repository) = repository().await else {
            return;
        };
        let id = queued(&repository).await;

        repository
            .begin_processing(&id, Checkpoint::STARTED)
            .await
            .unwrap()
            .unwrap();
        assert!(repository.complete(&id, completion(&id)).await.unwrap());
        assert!(!repository.fail(&id, "late failure").await.unwrap());
        assert!(repository
            .begin_processing(&id, Checkpoint::STARTED)
            .await
            .unwrap()
            .is_none());

        let job = repository.get(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.error, None);
        assert_eq!(job.text_preserved, Some(true));
    }

    #[tokio::test]
    async fn test_checkpoint_keeps_highest_progress() {
        let Some(repository) = repository().await else {
            return;
        };
        let id = queued(&repository).await;

        assert!(!repository.checkpoint(&id, Checkpoint::FORMATTING).await.unwrap());
        assert!(!repository.complete(&id, completion(&id)).await.unwrap());

        repository
            .begin_processing(&id, Checkpoint::STARTED)
            .await
            .unwrap()
            .unwrap();
        assert!(repository.checkpoint(&id, Checkpoint::FORMATTING).await.unwrap());
        assert!(repository.checkpoint(&id, Checkpoint::DOWNLOADING).await.unwrap());

        let job = repository.get(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.progress, 50);
        assert_eq!(job.status_message.as_deref(), Some("Downloading document"));
    }

    #[tokio::test]
    async fn test_duplicate_create_returns_existing_row() {
        let Some(repository) = repository().await else {
            return;
        };
        let id = queued(&repository).await;
        assert!(repository.fail(&id, "Queue is closed").await.unwrap());

        let outcome = repository
            .create_if_absent(NewJob {
                id: id.clone(),
                storage_path: "uploads/other.docx".to_string(),
                profile_name: "compact_clean".to_string(),
                owner: "alice".to_string(),
            })
            .await
            .unwrap();

        let CreateOutcome::Existing(existing) = outcome else {
            panic!("expected existing job");
        };
        assert_eq!(existing.state, JobState::Failed);
        assert_eq!(existing.storage_path, "uploads/in.docx");
        assert_eq!(existing.error.as_deref(), Some("Queue is closed"));
        assert!(repository
            .list_unfinished()
            .await
            .unwrap()
            .iter()
            .all(|job| job.id != id));
    }
}
