use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::error::LedgerError;
use crate::jobs::Job;

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: String,
    pub storage_path: String,
    pub profile_name: String,
    pub owner: String,
    pub state: String,
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

impl TryFrom<JobRow> for Job {
    type Error = LedgerError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = row.state.parse().map_err(|e| LedgerError::CorruptRecord {
            job_id: row.id.clone(),
            reason: format!("{}", e),
        })?;

        Ok(Job {
            id: row.id,
            storage_path: row.storage_path,
            profile_name: row.profile_name,
            owner: row.owner,
            state,
            progress: row.progress,
            status_message: row.status_message,
            formatted_text: row.formatted_text,
            result_path: row.result_path,
            result_url: row.result_url,
            error: row.error,
            text_preserved: row.text_preserved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
