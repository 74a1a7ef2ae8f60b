//! API error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build an error from a non-2xx response
    ///
    /// Uses the backend's `detail` field when the body carries one: either a
    /// plain string or a list of validation entries with `msg` fields.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = detail_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                default_reason(status).to_string()
            } else {
                trimmed.to_string()
            }
        });

        if status == 401 {
            ApiError::Unauthorized(message)
        } else {
            ApiError::Status { status, message }
        }
    }

    /// Check if this is an authentication failure
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Check if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            ApiError::Network(_) => true,
            ApiError::Timeout(_) => true,
            ApiError::Unauthorized(_) => false,
            ApiError::Decode(_) => false,
        }
    }

    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        422 => "Unprocessable entity",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}
