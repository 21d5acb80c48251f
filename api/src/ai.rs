//! Outbound client for the language-model collaborator.
//!
//! The model service speaks the OpenAI-compatible chat-completions protocol
//! (OpenRouter by default). Handlers depend on the [`CompletionClient`] trait
//! rather than the concrete client, so tests substitute a canned fake without
//! any process-wide state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("OPENROUTER_API_KEY must be configured")]
    MissingApiKey,
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned status {status}")]
    UpstreamStatus { status: reqwest::StatusCode },
    #[error("completion response contained no message content")]
    EmptyCompletion,
}

/// One chat-completion call. The prompt is the user message; `system` sets
/// the model's register (e.g. "respond ONLY with valid JSON").
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// The language-model collaborator, as the handlers see it: free text in,
/// free text out. Extraction and validation of that text is the core's job.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError>;
}

/// OpenRouter-compatible HTTP client.
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Configuration comes from `OPENROUTER_API_KEY` (required),
    /// `NOSH_AI_BASE_URL`, and `NOSH_AI_MODEL`.
    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(AiError::MissingApiKey)?;

        let base_url = std::env::var("NOSH_AI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let model =
            std::env::var("NOSH_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, model = %self.model, "completion request rejected upstream");
            return Err(AiError::UpstreamStatus { status });
        }

        let completion = response.json::<ChatCompletionResponse>().await?;
        first_content(completion).ok_or(AiError::EmptyCompletion)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The first choice's message content, if the response carried any.
fn first_content(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChatCompletionResponse {
        serde_json::from_str(raw).expect("response should deserialize")
    }

    #[test]
    fn first_content_reads_the_first_choice() {
        let response = parse(
            r#"{"choices":[{"message":{"content":"{\"a\":1}"}},{"message":{"content":"ignored"}}]}"#,
        );
        assert_eq!(first_content(response).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn missing_choices_is_none() {
        let response = parse(r#"{"choices":[]}"#);
        assert_eq!(first_content(response), None);
    }

    #[test]
    fn null_content_is_none() {
        let response = parse(r#"{"choices":[{"message":{"content":null}}]}"#);
        assert_eq!(first_content(response), None);
    }

    #[test]
    fn blank_content_is_none() {
        let response = parse(r#"{"choices":[{"message":{"content":"   "}}]}"#);
        assert_eq!(first_content(response), None);
    }

    #[test]
    fn unknown_response_fields_are_tolerated() {
        let response = parse(
            r#"{"id":"gen-1","usage":{"total_tokens":42},"choices":[{"index":0,"message":{"role":"assistant","content":"hi"}}]}"#,
        );
        assert_eq!(first_content(response).as_deref(), Some("hi"));
    }
}
