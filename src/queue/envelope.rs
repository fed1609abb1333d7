//! Queue message codec.
//!
//! Publishers emit `{"job_id": "..."}`. Consumers also accept the push
//! delivery envelope (`{"message": {"data": "<base64 JSON>"}}`) and a raw
//! encoded payload (a JSON string, base64 text, or `{"data": "<json>"}`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueueError;

/// Nesting levels tolerated before a payload is considered undecodable.
const MAX_DEPTH: usize = 6;
const PREVIEW_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: String,
}

impl JobMessage {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, QueueError> {
        Ok(serde_json::to_vec(self)?)
    }
}

pub fn extract_job_id(payload: &[u8]) -> Result<String, QueueError> {
    decode_bytes(payload, 0).ok_or_else(|| QueueError::Envelope(preview(payload)))
}

fn decode_bytes(payload: &[u8], depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(payload) {
        return decode_value(&value, depth);
    }
    let text = std::str::from_utf8(payload).ok()?.trim();
    let decoded = STANDARD.decode(text).ok()?;
    decode_bytes(&decoded, depth + 1)
}

fn decode_value(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if let Some(job_id) = map
                .get("job_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
            {
                return Some(job_id.to_string());
            }
            if let Some(found) = map.get("message").and_then(|m| decode_value(m, depth + 1)) {
                return Some(found);
            }
            map.get("data").and_then(|data| decode_value(data, depth + 1))
        }
        Value::String(text) => decode_bytes(text.as_bytes(), depth + 1),
        _ => None,
    }
}

fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() > PREVIEW_LEN {
        format!("{}...", text.chars().take(PREVIEW_LEN).collect::<String>())
    } else {
        text.into_owned()
    }
}
