//! Chat-completions implementation of [`Completer`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::{Completer, CompletionRequest, GenerationError};

const CHAT_COMPLETIONS_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4";
const MAX_COMPLETION_TOKENS: u32 = 2500;
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiCompleter {
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiCompleter {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete<'a>(&self, req: CompletionRequest<'a>) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: req.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: req.user_prompt,
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(model = %self.model, prompt_chars = req.user_prompt.len(), "Sending completion request");
        let response = self
            .http
            .post(CHAT_COMPLETIONS_ENDPOINT)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            // Timeouts and connection failures are worth another attempt.
            .map_err(|e| GenerationError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unreadable body>"));
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                GenerationError::Transient(format!("{status}: {message}"))
            } else {
                GenerationError::Rejected(format!("{status}: {message}"))
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Transient(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        info!(chars = content.len(), "Completion succeeded");
        Ok(content.trim().to_string())
    }
}
