//! # Anthropic Adapter
//!
//! Maps the normalized request/response shape onto the Anthropic messages
//! API (`/v1/messages`).

use futures::StreamExt;
use serde_json::json;

use crate::error::ProviderError;
use crate::models::LlmProvider;

use super::{
    sse_data_stream, AiRequest, AiResponse, ChunkStream, FinishReason, LlmAdapter, MessageRole,
    StreamChunk, ToolUse, Usage,
};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Build from `ANTHROPIC_API_KEY`; `None` when the key is absent, which
    /// the router treats as "not configured".
    pub fn from_env() -> Option<Self> {
        std::env::var(LlmProvider::Anthropic.api_key_env())
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
    }

    fn body(&self, request: &AiRequest, stream: bool) -> serde_json::Value {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| LlmProvider::Anthropic.default_model().to_string());

        // System content rides in a dedicated field, not the message list
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                json!({
                    "role": match m.role {
                        MessageRole::Assistant => "assistant",
                        _ => "user",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|t| json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                }))
                .collect::<Vec<_>>());
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(
        &self,
        request: &AiRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request, stream))
            .send()
            .await
            .map_err(|e| ProviderError::transport(LlmProvider::Anthropic, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                LlmProvider::Anthropic,
                status.as_u16(),
                message,
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        let response = self.send(request, false).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(LlmProvider::Anthropic, e.to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in body["content"].as_array().into_iter().flatten() {
            match block["type"].as_str() {
                Some("text") => content.push_str(block["text"].as_str().unwrap_or_default()),
                Some("tool_use") => tool_calls.push(ToolUse {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    arguments: block["input"].clone(),
                }),
                _ => {}
            }
        }

        let finish_reason = match body["stop_reason"].as_str() {
            Some("tool_use") => FinishReason::ToolUse,
            Some("max_tokens") => FinishReason::MaxTokens,
            _ => FinishReason::Stop,
        };

        Ok(AiResponse {
            content,
            tool_calls,
            model: body["model"].as_str().unwrap_or_default().to_string(),
            usage: Usage {
                input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
            },
            finish_reason,
        })
    }

    async fn stream(&self, request: &AiRequest) -> Result<ChunkStream, ProviderError> {
        let response = self.send(request, true).await?;
        let chunks = sse_data_stream(LlmProvider::Anthropic, response).filter_map(|line| async {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let event: serde_json::Value = serde_json::from_str(&line).ok()?;
            match event["type"].as_str() {
                Some("content_block_delta") => {
                    let delta = event["delta"]["text"].as_str()?.to_string();
                    Some(Ok(StreamChunk {
                        provider: LlmProvider::Anthropic,
                        delta,
                        done: false,
                    }))
                }
                Some("message_stop") => Some(Ok(StreamChunk {
                    provider: LlmProvider::Anthropic,
                    delta: String::new(),
                    done: true,
                })),
                _ => None,
            }
        });
        Ok(chunks.boxed())
    }
}
