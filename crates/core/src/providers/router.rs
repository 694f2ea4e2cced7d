//! # Provider Router
//!
//! Orders configured providers, retries transient failures with a linear
//! backoff, and falls back vendor by vendor. Constructed once and passed
//! explicitly - there is no process-wide router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CoreError, ProviderError};
use crate::models::LlmProvider;

use super::{AiRequest, AiResponse, ChunkStream, LlmAdapter};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_provider: LlmProvider,
    pub fallback_providers: Vec<LlmProvider>,
    /// Attempts per provider before moving on
    pub retry_attempts: u32,
    /// Base delay; attempt N waits `retry_delay * N`
    pub retry_delay: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_provider: LlmProvider::Anthropic,
            fallback_providers: vec![LlmProvider::OpenAI],
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

pub struct ProviderRouter {
    adapters: HashMap<LlmProvider, Arc<dyn LlmAdapter>>,
    config: RouterConfig,
}

impl ProviderRouter {
    pub fn new(adapters: Vec<Arc<dyn LlmAdapter>>, config: RouterConfig) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|a| (a.provider(), a))
            .collect();
        Self { adapters, config }
    }

    /// Build from environment credentials: a vendor with no API key is
    /// simply not configured.
    pub fn from_env(config: RouterConfig) -> Self {
        let mut adapters: Vec<Arc<dyn LlmAdapter>> = Vec::new();
        if let Some(adapter) = super::AnthropicAdapter::from_env() {
            adapters.push(Arc::new(adapter));
        }
        if let Some(adapter) = super::OpenAiAdapter::from_env() {
            adapters.push(Arc::new(adapter));
        }
        Self::new(adapters, config)
    }

    pub fn configured_providers(&self) -> Vec<LlmProvider> {
        self.adapters.keys().copied().collect()
    }

    /// Candidate order: the vendor owning the requested model, then the
    /// default, then fallbacks. Unconfigured providers are skipped.
    fn provider_order(&self, request: &AiRequest) -> Vec<LlmProvider> {
        let mut order = Vec::new();
        if let Some(owner) = request
            .model
            .as_deref()
            .and_then(LlmProvider::owner_of_model)
        {
            order.push(owner);
        }
        order.push(self.config.default_provider);
        order.extend(self.config.fallback_providers.iter().copied());

        let mut seen = Vec::new();
        order.retain(|p| {
            let keep = !seen.contains(p) && self.adapters.contains_key(p);
            seen.push(*p);
            keep
        });
        order
    }

    /// Try every candidate provider in order, retrying transient failures.
    /// Returns the first success; errs only when everything is exhausted.
    pub async fn complete(&self, request: &AiRequest) -> Result<AiResponse, CoreError> {
        let order = self.provider_order(request);
        let mut total_attempts = 0u32;
        let mut last_error: Option<ProviderError> = None;

        for provider in order {
            let adapter = &self.adapters[&provider];
            for attempt in 0..self.config.retry_attempts {
                if attempt > 0 {
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                total_attempts += 1;
                debug!(%provider, attempt, "provider attempt");

                match adapter.complete(request).await {
                    Ok(response) => return Ok(response),
                    Err(error) => {
                        warn!(%provider, attempt, %error, "provider attempt failed");
                        let retryable = error.retryable;
                        last_error = Some(error);
                        if !retryable {
                            break;
                        }
                    }
                }
            }
        }

        Err(CoreError::ProviderExhausted {
            attempts: total_attempts,
            last: last_error.unwrap_or_else(|| {
                ProviderError::malformed(self.config.default_provider, "no providers configured")
            }),
        })
    }

    /// Streaming variant: same provider order, but a stream that fails
    /// after opening is not retried - the next provider is tried instead.
    pub async fn stream(&self, request: &AiRequest) -> Result<ChunkStream, CoreError> {
        let order = self.provider_order(request);
        let mut total_attempts = 0u32;
        let mut last_error: Option<ProviderError> = None;

        for provider in order {
            let adapter = &self.adapters[&provider];
            total_attempts += 1;
            match adapter.stream(request).await {
                Ok(stream) => return Ok(stream),
                Err(error) => {
                    warn!(%provider, %error, "stream open failed");
                    last_error = Some(error);
                }
            }
        }

        Err(CoreError::ProviderExhausted {
            attempts: total_attempts,
            last: last_error.unwrap_or_else(|| {
                ProviderError::malformed(self.config.default_provider, "no providers configured")
            }),
        })
    }
}
