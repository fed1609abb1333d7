use std::sync::Arc;

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::api::job::dto::CreateJobResponse;
use crate::api::job::models::CreateJobRequest;
use crate::api::validation::{field_errors, ErrorResponse};
use crate::db::{CreateOutcome, JobLedger};
use crate::error::{LedgerError, QueueError};
use crate::formatting::DEFAULT_PROFILE;
use crate::jobs::{Job, JobState, NewJob};
use crate::queue::JobPublisher;

/// Errors that can occur in the job intake layer
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {0} already exists for another owner")]
    OwnerMismatch(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Failed to queue job {job_id}: {source}")]
    Publish {
        job_id: String,
        #[source]
        source: QueueError,
    },
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Validation(errors) => {
                warn!("Validation error: {}", errors);
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Validation failed".to_string(),
                    fields: serde_json::Value::Object(field_errors(errors)),
                })
            }
            ServiceError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse::message(
                    "Not found",
                    format!("Job with id {} not found", id),
                ))
            }
            ServiceError::OwnerMismatch(id) => {
                warn!("Duplicate job id {} from a different owner", id);
                HttpResponse::Conflict().json(ErrorResponse::message(
                    "Conflict",
                    format!("Job with id {} already exists", id),
                ))
            }
            ServiceError::Ledger(e) => {
                error!("Ledger error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse::message(
                    "Failed to process request",
                    "Database error occurred",
                ))
            }
            ServiceError::Publish { job_id, source } => {
                error!("Queue publish failed for job {}: {}", job_id, source);
                HttpResponse::ServiceUnavailable().json(ErrorResponse::message(
                    "Queue unavailable",
                    format!("Job {} could not be queued", job_id),
                ))
            }
        }
    }
}

/// Job intake: records jobs in the ledger and hands them to the queue.
pub struct JobService {
    ledger: Arc<dyn JobLedger>,
    publisher: Arc<dyn JobPublisher>,
}

impl JobService {
    pub fn new(ledger: Arc<dyn JobLedger>, publisher: Arc<dyn JobPublisher>) -> Self {
        Self { ledger, publisher }
    }

    /// Create a job, or return the existing one for a repeated `job_id`.
    ///
    /// # Business Logic
    /// - Rejects invalid requests before anything is written
    /// - A duplicate id from the same owner returns the stored job unchanged,
    ///   republishing it if it has not been picked up yet
    /// - A duplicate id from another owner is a conflict
    /// - A newly created job that cannot be queued is marked `FAILED`
    /// - A failed republish of a duplicate is only logged; the record is
    ///   never written and its first message is still queued
    #[instrument(skip(self, request), fields(job_id = tracing::field::Empty))]
    pub async fn create_job(
        &self,
        request: CreateJobRequest,
        owner: &str,
    ) -> Result<CreateJobResponse, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let CreateJobRequest {
            storage_path,
            profile_name,
            job_id,
        } = request;
        let job_id = job_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::Span::current().record("job_id", job_id.as_str());

        let new_job = NewJob {
            id: job_id,
            storage_path: storage_path.unwrap_or_default(),
            profile_name: profile_name.unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            owner: owner.to_string(),
        };

        match self.ledger.create_if_absent(new_job).await? {
            CreateOutcome::Created(job) => {
                info!("Service: Job {} created with profile {}", job.id, job.profile_name);
                self.enqueue(&job).await?;
                Ok(CreateJobResponse {
                    job_id: job.id,
                    state: job.state,
                    created: true,
                })
            }
            CreateOutcome::Existing(job) => {
                if job.owner != owner {
                    return Err(ServiceError::OwnerMismatch(job.id));
                }
                info!("Service: Job {} already exists in state {}", job.id, job.state);
                if job.state == JobState::Queued {
                    if let Err(e) = self.publisher.publish(&job.id).await {
                        warn!("Service: Could not republish job {}: {}", job.id, e);
                    }
                }
                Ok(CreateJobResponse {
                    job_id: job.id,
                    state: job.state,
                    created: false,
                })
            }
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.ledger
            .get(job_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(job_id.to_string()))
    }

    async fn enqueue(&self, job: &Job) -> Result<(), ServiceError> {
        let Err(source) = self.publisher.publish(&job.id).await else {
            return Ok(());
        };
        match self.ledger.fail(&job.id, &source.to_string()).await {
            Ok(_) => warn!("Service: Job {} marked failed, queue unavailable", job.id),
            Err(e) => error!("Service: Could not mark job {} failed: {}", job.id, e),
        }
        Err(ServiceError::Publish {
            job_id: job.id.clone(),
            source,
        })
    }
}
