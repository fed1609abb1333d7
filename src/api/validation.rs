use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::HttpResponse;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

impl ErrorResponse {
    pub fn message(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            fields: serde_json::json!({ "message": message.into() }),
        }
    }
}

/// Per-field messages, `{"field": {"errors": [...]}}`.
pub fn field_errors(errors: &ValidationErrors) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    for (field, errors) in errors.field_errors() {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
            })
            .collect();
        fields.insert(field.to_string(), serde_json::json!({ "errors": messages }));
    }
    fields
}

/// JSON extractor config shared by every handler: body size limit plus the
/// `{"error", "fields"}` rejection format.
pub fn json_config(limit: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let response = match err {
                actix_web_validator::Error::Validate(errors) => {
                    HttpResponse::BadRequest().json(ErrorResponse {
                        error: "Validation failed".to_string(),
                        fields: serde_json::Value::Object(field_errors(&errors)),
                    })
                }
                actix_web_validator::Error::JsonPayloadError(payload_err) => {
                    payload_error_response(&payload_err)
                }
                actix_web_validator::Error::Deserialize(de_err) => HttpResponse::BadRequest()
                    .json(ErrorResponse::message(
                        "Request validation failed",
                        deserialize_message(&de_err.to_string()),
                    )),
                _ => HttpResponse::BadRequest()
                    .json(ErrorResponse::message("Validation failed", "Validation error")),
            };
            InternalError::from_response("", response).into()
        })
}

fn payload_error_response(err: &JsonPayloadError) -> HttpResponse {
    match err {
        JsonPayloadError::OverflowKnownLength { limit, .. } | JsonPayloadError::Overflow { limit } => {
            HttpResponse::PayloadTooLarge().json(ErrorResponse::message(
                "Payload too large",
                format!("Request body exceeds {} bytes", limit),
            ))
        }
        JsonPayloadError::ContentType => HttpResponse::BadRequest().json(ErrorResponse::message(
            "Request validation failed",
            "Expected Content-Type: application/json",
        )),
        other => HttpResponse::BadRequest().json(ErrorResponse::message(
            "Request validation failed",
            deserialize_message(&other.to_string()),
        )),
    }
}

fn deserialize_message(err: &str) -> &'static str {
    if err.contains("EOF while parsing") {
        "Request body is empty. Expected JSON payload"
    } else if err.contains("invalid type") {
        "Invalid field type. Expected strings for storage_path, profile_name and job_id"
    } else {
        "Invalid JSON format"
    }
}
