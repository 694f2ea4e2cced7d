//! # OpenAI Adapter
//!
//! Maps the normalized request/response shape onto the OpenAI
//! chat-completions API. Supports a base-URL override for compatible
//! gateways.

use futures::StreamExt;
use serde_json::json;

use crate::error::ProviderError;
use crate::models::LlmProvider;

use super::{
    sse_data_stream, AiRequest, AiResponse, ChunkStream, FinishReason, LlmAdapter, MessageRole,
    StreamChunk, ToolUse, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build from `OPENAI_API_KEY`; `None` when the key is absent.
    pub fn from_env() -> Option<Self> {
        std::env::var(LlmProvider::OpenAI.api_key_env())
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
    }

    fn body(&self, request: &AiRequest, stream: bool) -> serde_json::Value {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| LlmProvider::OpenAI.default_model().to_string());

        // System prompt becomes the leading message
        let mut messages: Vec<serde_json::Value> = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for m in &request.messages {
            messages.push(json!({
                "role": match m.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                "content": m.content,
            }));
        }

        let mut body = json!({ "model": model, "messages": messages });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
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
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request, stream))
            .send()
            .await
            .map_err(|e| ProviderError::transport(LlmProvider::OpenAI, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                LlmProvider::OpenAI,
                status.as_u16(),
                message,
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAI
    }

    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        let response = self.send(request, false).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(LlmProvider::OpenAI, e.to_string()))?;

        let choice = &body["choices"][0];
        let message = &choice["message"];

        // Tool arguments arrive as a JSON-encoded string
        let tool_calls = message["tool_calls"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|call| ToolUse {
                id: call["id"].as_str().unwrap_or_default().to_string(),
                name: call["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                arguments: call["function"]["arguments"]
                    .as_str()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        let finish_reason = match choice["finish_reason"].as_str() {
            Some("tool_calls") => FinishReason::ToolUse,
            Some("length") => FinishReason::MaxTokens,
            _ => FinishReason::Stop,
        };

        Ok(AiResponse {
            content: message["content"].as_str().unwrap_or_default().to_string(),
            tool_calls,
            model: body["model"].as_str().unwrap_or_default().to_string(),
            usage: Usage {
                input_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
            },
            finish_reason,
        })
    }

    async fn stream(&self, request: &AiRequest) -> Result<ChunkStream, ProviderError> {
        let response = self.send(request, true).await?;
        let chunks = sse_data_stream(LlmProvider::OpenAI, response).filter_map(|line| async {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            if line == "[DONE]" {
                return Some(Ok(StreamChunk {
                    provider: LlmProvider::OpenAI,
                    delta: String::new(),
                    done: true,
                }));
            }
            let event: serde_json::Value = serde_json::from_str(&line).ok()?;
            let delta = event["choices"][0]["delta"]["content"].as_str()?.to_string();
            Some(Ok(StreamChunk {
                provider: LlmProvider::OpenAI,
                delta,
                done: false,
            }))
        });
        Ok(chunks.boxed())
    }
}
