//! # Providers
//!
//! Normalized request/response types for LLM backends, the adapter trait
//! both vendors implement, and the retry/fallback router. Model inference
//! always goes through `LlmAdapter`, so tests substitute scripted fakes.

pub mod anthropic;
pub mod openai;
pub mod router;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::models::LlmProvider;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
pub use router::{ProviderRouter, RouterConfig};

/// Message role in the normalized chat shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: MessageRole,
    pub content: String,
}

impl AiMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A tool schema advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Normalized completion request, vendor-agnostic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<AiMessage>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// A tool invocation emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Normalized completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolUse>,
    pub model: String,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

/// One streamed text delta, tagged with the provider that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub provider: LlmProvider,
    pub delta: String,
    pub done: bool,
}

pub type ChunkStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

/// The seam every vendor backend implements. Adapters are plain async
/// calls over HTTP; dropping the future before completion aborts the
/// request without side effects.
#[async_trait::async_trait]
pub trait LlmAdapter: Send + Sync {
    fn provider(&self) -> LlmProvider;

    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, ProviderError>;

    /// Open a streaming completion. Errors after the stream starts are
    /// yielded in-band; the router does not retry mid-stream.
    async fn stream(&self, request: &AiRequest) -> Result<ChunkStream, ProviderError>;
}

/// Split a vendor SSE body into the payloads of its `data:` lines.
pub(crate) fn sse_data_stream(
    provider: LlmProvider,
    response: reqwest::Response,
) -> impl futures::Stream<Item = Result<String, ProviderError>> + Send {
    let bytes = response.bytes_stream();
    futures::stream::try_unfold(
        (bytes, String::new(), std::collections::VecDeque::new()),
        move |(mut bytes, mut buffer, mut queued)| async move {
            loop {
                if let Some(line) = queued.pop_front() {
                    return Ok(Some((line, (bytes, buffer, queued))));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(newline) = buffer.find('\n') {
                            let line = buffer[..newline].trim_end_matches('\r').to_string();
                            buffer.drain(..=newline);
                            if let Some(data) = line.strip_prefix("data: ") {
                                queued.push_back(data.to_string());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(provider, e.to_string()))
                    }
                    None => return Ok(None),
                }
            }
        },
    )
}
