//! Text-completion backends for the advice pipeline
//!
//! [`OpenAiClient`] speaks the OpenAI chat-completions wire format. The
//! request and response types below only carry the fields the pipeline uses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of one completion call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The service refused the call because of its rate limit
    #[error("inference service rate limited the request")]
    RateLimited,

    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),

    /// Any non-success status other than 429
    #[error("inference service returned status {status}")]
    Upstream { status: u16 },

    /// A success response without usable text
    #[error("inference service returned an empty response")]
    EmptyResponse,
}

/// A text-completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Complete a single-turn prompt
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Whether the client has what it needs to reach its service
    fn is_configured(&self) -> bool {
        true
    }
}

/// One message of a chat-completions conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if it has any
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Build a client whose requests give up after `timeout`
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::Transport("OPENAI_API_KEY is not set".to_string()))?;

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            debug!("Inference service answered 429");
            return Err(InferenceError::RateLimited);
        }
        if !status.is_success() {
            warn!("Inference service answered {}", status);
            return Err(InferenceError::Upstream {
                status: status.as_u16(),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        completion.into_text().ok_or(InferenceError::EmptyResponse)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
