use serde::Serialize;

use crate::formatting::FormatProfile;
use crate::jobs::JobState;

/// Response for job creation
#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub state: JobState,
    /// `false` when an existing job was returned for a duplicate id.
    #[serde(skip_serializing)]
    pub created: bool,
}

/// Response for `GET /profiles`
#[derive(Debug, Serialize)]
pub struct ProfilesResponse {
    pub default: &'static str,
    pub profiles: Vec<&'static FormatProfile>,
}
