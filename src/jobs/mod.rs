pub mod models;
pub mod state;

pub use models::{Completion, Job, NewJob};
pub use state::{Checkpoint, JobState, UnknownState, FAILED_MESSAGE};

/// Object path of the formatted artifact for a job.
pub fn artifact_path(job_id: &str) -> String {
    format!("outputs/{}_formatted.docx", job_id)
}
