use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure talking to one of the external collaborators (orchestrator,
/// identity provider, blueprint store).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("response had no body")]
    EmptyBody,

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Message suitable for showing to the operator.
    pub fn detail(&self) -> String {
        match self {
            ClientError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Builds a `Status` error from a non-success response, pulling the
    /// human-readable message out of the body when there is one.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ClientError::Status {
            status,
            detail: extract_detail(&body),
        }
    }
}

const DETAIL_FIELDS: [&str; 5] = ["detail", "error_description", "msg", "message", "error"];

/// First present message field of a JSON error body, else the raw text.
pub fn extract_detail(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in DETAIL_FIELDS {
            match map.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
                Some(Value::Null) | None => continue,
                Some(Value::String(_)) => continue,
                Some(other) => return other.to_string(),
            }
        }
        return "Unknown Error".to_string();
    }

    let text = body.trim();
    if text.is_empty() {
        "Unknown Error".to_string()
    } else {
        text.to_string()
    }
}
