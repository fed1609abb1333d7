use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::formatting::profiles;

const MAX_JOB_ID_LEN: usize = 128;

/// Body of `POST /jobs`
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct CreateJobRequest {
    #[validate(
        required(message = "storage_path is required"),
        custom(function = "validate_storage_path")
    )]
    pub storage_path: Option<String>,

    #[validate(custom(function = "validate_profile_name"))]
    pub profile_name: Option<String>,

    #[validate(custom(function = "validate_job_id"))]
    pub job_id: Option<String>,
}

fn validate_storage_path(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "storage_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_profile_name(value: &str) -> Result<(), ValidationError> {
    if profiles::is_registered(value) {
        return Ok(());
    }
    Err(invalid(
        "unknown_profile",
        format!(
            "Unknown profile '{}'. Expected one of: {}",
            value,
            profiles::names().join(", ")
        ),
    ))
}

fn validate_job_id(value: &str) -> Result<(), ValidationError> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if value.is_empty() || value.len() > MAX_JOB_ID_LEN || !valid_chars {
        return Err(invalid(
            "job_id",
            format!(
                "job_id must be 1-{} characters of letters, digits, '-' or '_'",
                MAX_JOB_ID_LEN
            ),
        ));
    }
    Ok(())
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}
