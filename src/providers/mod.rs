pub mod hosted;
pub(crate) mod http_errors;
pub mod inference;
pub mod ollama;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Transport(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Single-message chat payload shared by the hosted and local adapters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Reads the body of a non-success response into an `AdapterError::Status`.
pub(crate) async fn status_error(response: reqwest::Response) -> AdapterError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".to_string());
    AdapterError::Status { status, body }
}

fn join_url(base_url: &str, suffix: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), suffix)
}
