//! Per-model inference endpoint (`POST <base><model path>` with `{"inputs": ...}`).

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::http_errors::transport_error;
use super::{AdapterError, status_error};
use crate::config::Config;
use crate::dispatcher::{BackendFuture, ChatBackend};

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    token: String,
    timeout_secs: u64,
}

impl InferenceClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.inference_base_url.clone(),
            token: cfg.inference_token.clone(),
            timeout_secs: cfg.model_timeout_secs,
        }
    }

    pub async fn infer(&self, model_path: &str, question: &str) -> Result<String, AdapterError> {
        // The model path is appended verbatim; the base URL carries the trailing slash.
        let api_url = format!("{}{}", self.base_url, model_path);
        debug!(api_url = %api_url, model = %model_path, "sending inference request");

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.token)
            .json(&InferenceRequest { inputs: question })
            .send()
            .await
            .map_err(|err| {
                transport_error(err, &api_url, "INFERENCE_BASE_URL", self.timeout_secs)
            })?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            debug!(
                api_url = %api_url,
                model = %model_path,
                error = %err,
                "inference endpoint returned non-success status"
            );
            return Err(err);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AdapterError::MalformedResponse(err.to_string()))?;
        let text = generated_text(&body)?;
        debug!(model = %model_path, response_len = text.len(), "received inference response");
        Ok(text)
    }
}

/// Joins every `generated_text` in an array body, one per line. An object
/// carrying `error` is a backend failure; any other shape yields no text.
fn generated_text(body: &Value) -> Result<String, AdapterError> {
    if let Some(message) = body.get("error") {
        let message = match message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Err(AdapterError::Backend(message));
    }

    let Some(items) = body.as_array() else {
        return Ok(String::new());
    };

    let mut text = String::new();
    for generated in items
        .iter()
        .filter_map(|item| item.get("generated_text"))
        .filter_map(Value::as_str)
    {
        text.push_str(generated);
        text.push('\n');
    }
    Ok(text)
}

impl ChatBackend for InferenceClient {
    fn ask<'a>(&'a self, model: &'a str, question: &'a str) -> BackendFuture<'a> {
        Box::pin(self.infer(model, question))
    }
}
