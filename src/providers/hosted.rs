use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_errors::transport_error;
use super::{AdapterError, ChatMessage, join_url, status_error};
use crate::config::Config;
use crate::dispatcher::{BackendFuture, ChatBackend};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client (Groq by default).
#[derive(Clone)]
pub struct HostedChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl HostedChatClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.hosted_base_url.clone(),
            api_key: cfg.hosted_api_key.clone(),
            timeout_secs: cfg.model_timeout_secs,
        }
    }

    pub async fn chat(&self, model_name: &str, question: &str) -> Result<String, AdapterError> {
        let api_url = join_url(&self.base_url, "chat/completions");
        let body = ChatCompletionRequest {
            model: model_name,
            messages: vec![ChatMessage::user(question)],
        };
        debug!(api_url = %api_url, model = %model_name, "sending chat completion request");

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(err, &api_url, "HOSTED_BASE_URL", self.timeout_secs))?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            debug!(
                api_url = %api_url,
                model = %model_name,
                error = %err,
                "chat completion returned non-success status"
            );
            return Err(err);
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AdapterError::MalformedResponse(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AdapterError::MalformedResponse("chat completion returned no content".to_string())
            })?;
        debug!(model = %model_name, response_len = content.len(), "received chat completion");
        Ok(content)
    }
}

impl ChatBackend for HostedChatClient {
    fn ask<'a>(&'a self, model: &'a str, question: &'a str) -> BackendFuture<'a> {
        Box::pin(self.chat(model, question))
    }
}
