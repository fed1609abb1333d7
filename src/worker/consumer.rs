use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::db::JobLedger;
use crate::error::{ConsumerError, ProcessingError};
use crate::formatting::docx::DOCX_CONTENT_TYPE;
use crate::formatting::{engine, profiles};
use crate::jobs::{artifact_path, Checkpoint, Completion, Job, JobState};
use crate::queue::extract_job_id;
use crate::storage::{path, ObjectStore};

/// What handling one message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// No job with this id exists.
    Missing,
    /// The job was already terminal; nothing was written.
    AlreadyFinished(JobState),
    Completed { text_preserved: bool },
    /// The job was marked failed with this message.
    Failed(String),
}

/// Turns a queue message into a finished job.
pub struct JobConsumer {
    ledger: Arc<dyn JobLedger>,
    store: Arc<dyn ObjectStore>,
}

impl JobConsumer {
    pub fn new(ledger: Arc<dyn JobLedger>, store: Arc<dyn ObjectStore>) -> Self {
        Self { ledger, store }
    }

    pub async fn handle(&self, payload: &[u8]) -> Result<HandleOutcome, ConsumerError> {
        let job_id = extract_job_id(payload).inspect_err(|e| error!("Dropping message: {}", e))?;
        self.handle_job(&job_id).await
    }

    #[instrument(skip(self))]
    pub async fn handle_job(&self, job_id: &str) -> Result<HandleOutcome, ConsumerError> {
        let job = match self.ledger.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job {} not found, ignoring message", job_id);
                return Ok(HandleOutcome::Missing);
            }
            Err(e) => return self.record_failure(job_id, e.into()).await,
        };

        if job.state.is_terminal() {
            info!("Job {} already {}, skipping", job_id, job.state);
            return Ok(HandleOutcome::AlreadyFinished(job.state));
        }

        match self.process(job).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => self.record_failure(job_id, e).await,
        }
    }

    async fn process(&self, job: Job) -> Result<HandleOutcome, ProcessingError> {
        let Some(job) = self
            .ledger
            .begin_processing(&job.id, Checkpoint::STARTED)
            .await?
        else {
            // Another delivery finished the job since it was loaded.
            let state = self.ledger.get(&job.id).await?.map_or(job.state, |j| j.state);
            return Ok(HandleOutcome::AlreadyFinished(state));
        };

        let object_path = path::normalize(&job.storage_path);
        info!("Processing job {}: {} with profile {}", job.id, object_path, job.profile_name);

        self.ledger.checkpoint(&job.id, Checkpoint::DOWNLOADING).await?;
        let source = self.store.fetch(&object_path).await?;

        self.ledger.checkpoint(&job.id, Checkpoint::FORMATTING).await?;
        let profile = profiles::resolve(&job.profile_name);
        let formatted = tokio::task::spawn_blocking(move || engine::apply(&source, profile))
            .await
            .map_err(|e| ProcessingError::Task(e.to_string()))??;
        if !formatted.text_preserved {
            warn!("Job {} completed with altered text", job.id);
        }

        self.ledger.checkpoint(&job.id, Checkpoint::UPLOADING).await?;
        let result_path = artifact_path(&job.id);
        let result_url = self
            .store
            .store(&result_path, formatted.bytes, DOCX_CONTENT_TYPE)
            .await?;

        let completion = Completion {
            formatted_text: formatted.text,
            result_path,
            result_url,
            text_preserved: formatted.text_preserved,
        };
        if !self.ledger.complete(&job.id, completion).await? {
            let state = self.ledger.get(&job.id).await?.map_or(job.state, |j| j.state);
            warn!("Job {} finished elsewhere as {}, result discarded", job.id, state);
            return Ok(HandleOutcome::AlreadyFinished(state));
        }

        info!("Job {} completed", job.id);
        Ok(HandleOutcome::Completed {
            text_preserved: formatted.text_preserved,
        })
    }

    /// Marks the job failed unless it is already terminal. The guard lives in
    /// the ledger's conditional write, not in a prior read.
    async fn record_failure(
        &self,
        job_id: &str,
        failure: ProcessingError,
    ) -> Result<HandleOutcome, ConsumerError> {
        let message = failure.to_string();
        error!("Job {} failed: {}", job_id, message);
        match self.ledger.fail(job_id, &message).await {
            Ok(true) => Ok(HandleOutcome::Failed(message)),
            Ok(false) => match self.ledger.get(job_id).await {
                Ok(Some(job)) => {
                    warn!("Job {} already {}, failure not recorded", job_id, job.state);
                    Ok(HandleOutcome::AlreadyFinished(job.state))
                }
                Ok(None) => Ok(HandleOutcome::Missing),
                Err(source) => Err(ConsumerError::FailureNotRecorded {
                    job_id: job_id.to_string(),
                    source,
                }),
            },
            Err(source) => Err(ConsumerError::FailureNotRecorded {
                job_id: job_id.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::db::{CreateOutcome, InMemoryJobLedger};
    use crate::error::{LedgerError, StorageError};
    use crate::formatting::extract::extract_docx_text;
    use crate::formatting::fixtures::DocxBuilder;
    use crate::jobs::NewJob;
    use crate::queue::JobMessage;
    use crate::storage::memory::InMemoryObjectStore;

    struct Harness {
        ledger: Arc<InMemoryJobLedger>,
        store: Arc<InMemoryObjectStore>,
        consumer: JobConsumer,
    }

    impl Harness {
        fn new() -> Self {
            let ledger = Arc::new(InMemoryJobLedger::new());
            let store = Arc::new(InMemoryObjectStore::new());
            let consumer = JobConsumer::new(ledger.clone(), store.clone());
            Self {
                ledger,
                store,
                consumer,
            }
        }

        async fn create(&self, id: &str, storage_path: &str, profile: &str) {
            self.ledger
                .create_if_absent(NewJob {
                    id: id.to_string(),
                    storage_path: storage_path.to_string(),
                    profile_name: profile.to_string(),
                    owner: String::new(),
                })
                .await
                .unwrap();
        }

        async fn deliver(&self, id: &str) -> HandleOutcome {
            let payload = JobMessage::new(id).encode().unwrap();
            self.consumer.handle(&payload).await.unwrap()
        }

        async fn job(&self, id: &str) -> Job {
            self.ledger.get(id).await.unwrap().unwrap()
        }
    }

    fn sample_document() -> Vec<u8> {
        DocxBuilder::new()
            .heading(1, "Quarterly report")
            .styled_paragraph(&["Revenue grew ", "12%"], "Arial", 11)
            .table(&[&["Region", "Total"]])
            .paragraph("Thanks for reading.")
            .build()
    }

    #[tokio::test]
    async fn test_formats_and_completes_job() {
        let harness = Harness::new();
        harness.store.insert("uploads/in.docx", sample_document()).await;
        harness
            .create("job-1", "gs://bucket/uploads/in.docx", "large_readable")
            .await;

        let outcome = harness.deliver("job-1").await;
        assert_eq!(outcome, HandleOutcome::Completed { text_preserved: true });

        let job = harness.job("job-1").await;
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.status_message.as_deref(), Some("Completed"));
        assert_eq!(job.error, None);
        assert_eq!(job.text_preserved, Some(true));
        assert_eq!(job.result_path.as_deref(), Some("outputs/job-1_formatted.docx"));
        assert_eq!(
            job.result_url.as_deref(),
            Some("memory://outputs/job-1_formatted.docx")
        );

        let artifact = harness.store.get("outputs/job-1_formatted.docx").await.unwrap();
        let text = extract_docx_text(&artifact).unwrap();
        assert_eq!(job.formatted_text.as_deref(), Some(text.as_str()));
        assert_eq!(text, extract_docx_text(&sample_document()).unwrap());
    }

    #[tokio::test]
    async fn test_completed_job_is_not_written_again() {
        let harness = Harness::new();
        harness.store.insert("in.docx", sample_document()).await;
        harness.create("job-1", "in.docx", "standard_clean").await;
        harness.deliver("job-1").await;
        let writes = harness.ledger.write_count();
        let before = harness.job("job-1").await;

        let outcome = harness.deliver("job-1").await;

        assert_eq!(outcome, HandleOutcome::AlreadyFinished(JobState::Completed));
        assert_eq!(harness.ledger.write_count(), writes);
        assert_eq!(harness.job("job-1").await, before);
    }

    #[tokio::test]
    async fn test_missing_job_is_ignored() {
        let harness = Harness::new();
        assert_eq!(harness.deliver("ghost").await, HandleOutcome::Missing);
        assert_eq!(harness.ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_fails_job_with_storage_error() {
        let harness = Harness::new();
        harness
            .create(
                "job-1",
                "https://host/v0/b/bucket/o/uploads%2Fmissing.docx?alt=media&token=t",
                "standard_clean",
            )
            .await;

        let outcome = harness.deliver("job-1").await;

        let message = "File not found at storage path: uploads/missing.docx";
        assert_eq!(outcome, HandleOutcome::Failed(message.to_string()));
        let job = harness.job("job-1").await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some(message));
        assert_eq!(job.status_message.as_deref(), Some("Failed"));
        assert_eq!(job.progress, 20);
        assert!(harness.store.get("outputs/job-1_formatted.docx").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_document_fails_job() {
        let harness = Harness::new();
        harness.store.insert("in.docx", b"plain text, not a zip".to_vec()).await;
        harness.create("job-1", "in.docx", "compact_clean").await;

        let HandleOutcome::Failed(message) = harness.deliver("job-1").await else {
            panic!("expected failure");
        };
        assert!(message.starts_with("Invalid DOCX package"), "{message}");
        assert_eq!(harness.job("job-1").await.state, JobState::Failed);

        // Redelivery leaves the failure in place.
        assert_eq!(
            harness.deliver("job-1").await,
            HandleOutcome::AlreadyFinished(JobState::Failed)
        );
    }

    #[tokio::test]
    async fn test_interrupted_job_is_resumed() {
        let harness = Harness::new();
        harness.store.insert("in.docx", sample_document()).await;
        harness.create("job-1", "in.docx", "standard_clean").await;
        harness
            .ledger
            .begin_processing("job-1", Checkpoint::STARTED)
            .await
            .unwrap();
        harness
            .ledger
            .checkpoint("job-1", Checkpoint::FORMATTING)
            .await
            .unwrap();

        let outcome = harness.deliver("job-1").await;
        assert_eq!(outcome, HandleOutcome::Completed { text_preserved: true });
    }

    #[tokio::test]
    async fn test_undecodable_message_writes_nothing() {
        let harness = Harness::new();
        let err = harness.consumer.handle(b"\x00\x01garbage").await.unwrap_err();
        assert!(matches!(err, ConsumerError::Envelope(_)));
        assert_eq!(harness.ledger.write_count(), 0);
    }

    /// Store whose fetch loses a race: another delivery completes the job
    /// before the download fails.
    struct RacingStore {
        ledger: Arc<InMemoryJobLedger>,
    }

    #[async_trait]
    impl ObjectStore for RacingStore {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            let completion = Completion {
                formatted_text: "Done elsewhere".to_string(),
                result_path: artifact_path("job-1"),
                result_url: "memory://outputs/job-1_formatted.docx".to_string(),
                text_preserved: true,
            };
            assert!(self.ledger.complete("job-1", completion).await.unwrap());
            Err(StorageError::NotFound(path.to_string()))
        }

        async fn store(
            &self,
            path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            Ok(format!("memory://{}", path))
        }
    }

    #[tokio::test]
    async fn test_failure_after_racing_completion_reports_finished_state() {
        let ledger = Arc::new(InMemoryJobLedger::new());
        let consumer = JobConsumer::new(
            ledger.clone(),
            Arc::new(RacingStore {
                ledger: ledger.clone(),
            }),
        );
        ledger
            .create_if_absent(NewJob {
                id: "job-1".to_string(),
                storage_path: "in.docx".to_string(),
                profile_name: "standard_clean".to_string(),
                owner: String::new(),
            })
            .await
            .unwrap();

        let outcome = consumer.handle_job("job-1").await.unwrap();

        assert_eq!(outcome, HandleOutcome::AlreadyFinished(JobState::Completed));
        let job = ledger.get("job-1").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.error, None);
        assert_eq!(job.formatted_text.as_deref(), Some("Done elsewhere"));
    }

    struct UnavailableLedger;

    #[async_trait]
    impl JobLedger for UnavailableLedger {
        async fn create_if_absent(&self, _job: NewJob) -> Result<CreateOutcome, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn get(&self, _job_id: &str) -> Result<Option<Job>, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn begin_processing(
            &self,
            _job_id: &str,
            _checkpoint: Checkpoint,
        ) -> Result<Option<Job>, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn checkpoint(&self, _job_id: &str, _checkpoint: Checkpoint) -> Result<bool, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn complete(&self, _job_id: &str, _completion: Completion) -> Result<bool, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn fail(&self, _job_id: &str, _error: &str) -> Result<bool, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn list_unfinished(&self) -> Result<Vec<Job>, LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
        async fn ping(&self) -> Result<(), LedgerError> {
            Err(sqlx::Error::PoolClosed.into())
        }
    }

    #[tokio::test]
    async fn test_unrecordable_failure_is_surfaced() {
        let consumer = JobConsumer::new(
            Arc::new(UnavailableLedger),
            Arc::new(InMemoryObjectStore::new()),
        );
        let err = consumer.handle_job("job-1").await.unwrap_err();
        assert!(matches!(err, ConsumerError::FailureNotRecorded { ref job_id, .. } if job_id == "job-1"));
    }
}
