use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::JobState;

/// A formatting job as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    pub storage_path: String,
    pub profile_name: String,
    pub owner: String,
    pub state: JobState,
    pub progress: i32,
    pub status_message: Option<String>,
    pub formatted_text: Option<String>,
    pub result_path: Option<String>,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub text_preserved: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn queued(new_job: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id: new_job.id,
            storage_path: new_job.storage_path,
            profile_name: new_job.profile_name,
            owner: new_job.owner,
            state: JobState::Queued,
            progress: 0,
            status_message: None,
            formatted_text: None,
            result_path: None,
            result_url: None,
            error: None,
            text_preserved: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields supplied when a job is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub id: String,
    pub storage_path: String,
    pub profile_name: String,
    pub owner: String,
}

/// Result fields written when a job completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub formatted_text: String,
    pub result_path: String,
    pub result_url: String,
    pub text_preserved: bool,
}
