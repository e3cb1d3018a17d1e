//! Language model client.
//!
//! Talks to an Ollama server through its chat endpoint. One request per call,
//! no streaming, no retry; the caller waits as long as the model takes.

use std::collections::HashMap;

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::prompts::PromptTemplate;

/// Anything that turns a prompt into a completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the prompt and returns the completion text verbatim.
    async fn complete(&self, prompt: &str) -> AppResult<String>;

    /// Fills the template and completes it.
    async fn complete_template(
        &self,
        template: PromptTemplate,
        variables: &HashMap<&str, String>,
    ) -> AppResult<String> {
        let prompt = template.fill(variables)?;
        self.complete(&prompt).await
    }
}

/// Chat message of the Ollama API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Ollama-backed [`LanguageModel`].
pub struct OllamaClient {
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http_client,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Calling language model");

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("language model unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "language model returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("language model returned an invalid response: {}", e))
        })?;

        Ok(chat.message.content)
    }
}
