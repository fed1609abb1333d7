use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a job: `QUEUED -> PROCESSING -> {COMPLETED | FAILED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::Queued,
        JobState::Processing,
        JobState::Completed,
        JobState::Failed,
    ];

    /// States a worker may still act on.
    pub const UNFINISHED: [JobState; 2] = [JobState::Queued, JobState::Processing];

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Processing => "PROCESSING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            JobState::Queued => matches!(next, JobState::Processing | JobState::Failed),
            // Redelivery restarts an interrupted attempt.
            JobState::Processing => !matches!(next, JobState::Queued),
            JobState::Completed | JobState::Failed => false,
        }
    }

    /// Every state a job may be in for a move to `next` to be allowed.
    pub fn predecessors(next: JobState) -> Vec<JobState> {
        Self::ALL
            .into_iter()
            .filter(|state| state.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown job state '{0}'")]
pub struct UnknownState(pub String);

impl FromStr for JobState {
    type Err = UnknownState;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "QUEUED" => Ok(JobState::Queued),
            "PROCESSING" => Ok(JobState::Processing),
            "COMPLETED" => Ok(JobState::Completed),
            "FAILED" => Ok(JobState::Failed),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// A progress checkpoint reported while a job is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub progress: i32,
    pub message: &'static str,
}

impl Checkpoint {
    pub const STARTED: Checkpoint = Checkpoint::new(5, "Processing");
    pub const DOWNLOADING: Checkpoint = Checkpoint::new(20, "Downloading document");
    pub const FORMATTING: Checkpoint = Checkpoint::new(50, "Formatting your document");
    pub const UPLOADING: Checkpoint = Checkpoint::new(90, "Uploading formatted document");
    pub const COMPLETED: Checkpoint = Checkpoint::new(100, "Completed");

    const fn new(progress: i32, message: &'static str) -> Self {
        Self { progress, message }
    }
}

pub const FAILED_MESSAGE: &str = "Failed";
