//! Raw transport for the inference client contract: one call operation
//! that accepts text plus inline base64 image content parts and returns
//! either a structured object or a JSON-in-text response.
//!
//! OpenAI-compatible chat-completions wire format, `max_retries=6` and
//! `temperature=0` by default.

use crate::domain::TokenUsage;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// One inline image, base64-encoded as a data URL, with a `detail` hint.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub data_url: String,
    pub detail: &'static str,
}

impl ImagePart {
    pub fn low_detail(jpeg_bytes: &[u8]) -> Self {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg_bytes);
        Self {
            data_url: format!("data:image/jpeg;base64,{encoded}"),
            detail: "low",
        }
    }
}

/// A single completion request: system framing, user text, and zero or
/// more images. `json_mode` asks the upstream API to constrain its output
/// to a JSON object (used for checklist-batch evaluation).
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_text: String,
    pub images: Vec<ImagePart>,
    pub json_mode: bool,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// The inference client contract: one call operation, with retries and
/// temperature=0 delegated to the implementation.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, PipelineError>;
}

/// An OpenAI-compatible chat-completions client over `reqwest`.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, max_retries: u32) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client builds");

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_retries: max_retries.max(1),
        }
    }

    fn content_parts(request: &CompletionRequest<'_>) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::Text {
            text: request.user_text.clone(),
        }];
        for img in &request.images {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: img.data_url.clone(),
                    detail: img.detail.to_string(),
                },
            });
        }
        parts
    }

    async fn attempt(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<CompletionResponse, PipelineError> {
        let body = ChatCompletionRequest {
            model: request.model.to_string(),
            temperature: 0.0,
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(request.system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(Self::content_parts(request)),
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamTransient(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let kind = if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                PipelineError::UpstreamTransient(format!("{status}: {text}"))
            } else {
                PipelineError::UpstreamFatal(format!("{status}: {text}"))
            };
            return Err(kind);
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamTransient(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let usage = parsed.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse { content, usage })
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, PipelineError> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let outcome = tokio::select! {
                res = self.attempt(&request) => res,
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(PipelineError::UpstreamTransient(msg)) => {
                    warn!(attempt, %msg, "inference call failed transiently, retrying");
                    last_err = Some(PipelineError::UpstreamTransient(msg));
                    if attempt + 1 < self.max_retries {
                        let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(5)));
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Err(PipelineError::UpstreamFatal(format!(
            "inference call failed after {} attempts: {}",
            self.max_retries,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

// --- Wire types -------------------------------------------------------

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageWire>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct UsageWire {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}
