use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_errors::transport_error;
use super::{AdapterError, ChatMessage, join_url, status_error};
use crate::config::Config;
use crate::dispatcher::{BackendFuture, ChatBackend};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Client for a locally running Ollama daemon.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.ollama_base_url.clone(),
            timeout_secs: cfg.model_timeout_secs,
        }
    }

    pub async fn chat_local(
        &self,
        model_name: &str,
        question: &str,
    ) -> Result<String, AdapterError> {
        let api_url = join_url(&self.base_url, "api/chat");
        let body = OllamaChatRequest {
            model: model_name,
            stream: false,
            messages: vec![ChatMessage::user(question)],
        };
        debug!(api_url = %api_url, model = %model_name, "sending ollama chat request");

        let response = self
            .client
            .post(&api_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                debug!(
                    api_url = %api_url,
                    model = %model_name,
                    error = %err,
                    "ollama request failed"
                );
                transport_error(err, &api_url, "OLLAMA_BASE_URL", self.timeout_secs)
            })?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|err| AdapterError::MalformedResponse(err.to_string()))?;
        debug!(
            model = %model_name,
            response_len = parsed.message.content.len(),
            "received ollama chat response"
        );
        Ok(parsed.message.content)
    }
}

impl ChatBackend for OllamaClient {
    fn ask<'a>(&'a self, model: &'a str, question: &'a str) -> BackendFuture<'a> {
        Box::pin(self.chat_local(model, question))
    }
}
