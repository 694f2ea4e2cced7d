//! # Error Taxonomy
//!
//! Typed errors shared across the orchestration core. Validation problems in
//! the pipeline and action layer are surfaced as data (`ValidationResult`,
//! `ActionResult`), never as `Err` - the variants here cover the conditions
//! that genuinely propagate: provider failures and persistence conflicts.

use thiserror::Error;

use crate::models::LlmProvider;

/// Failure from a single LLM vendor call.
#[derive(Debug, Error)]
#[error("{provider} request failed (status {status_code:?}): {message}")]
pub struct ProviderError {
    pub provider: LlmProvider,
    /// HTTP status when the vendor responded, `None` for transport errors.
    pub status_code: Option<u16>,
    pub message: String,
    /// Whether the router may retry this attempt (429 and 5xx are retryable,
    /// other client errors are fatal for the provider).
    pub retryable: bool,
}

impl ProviderError {
    pub fn from_status(provider: LlmProvider, status: u16, message: impl Into<String>) -> Self {
        Self {
            provider,
            status_code: Some(status),
            message: message.into(),
            retryable: status == 429 || status >= 500,
        }
    }

    /// Transport-level failure (connect, timeout). Treated as retryable.
    pub fn transport(provider: LlmProvider, message: impl Into<String>) -> Self {
        Self {
            provider,
            status_code: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// Malformed or unexpected response body. Not retryable.
    pub fn malformed(provider: LlmProvider, message: impl Into<String>) -> Self {
        Self {
            provider,
            status_code: None,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Every configured provider was tried and failed.
    #[error("all providers exhausted after {attempts} attempts; last error: {last}")]
    ProviderExhausted { attempts: u32, last: ProviderError },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Optimistic concurrency conflict on a memory record.
    #[error("stale version for {record} (expected {expected}, found {found})")]
    StaleVersion {
        record: String,
        expected: i64,
        found: i64,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Persistence-layer failure. Never swallowed by the orchestrator.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let rate_limited = ProviderError::from_status(LlmProvider::Anthropic, 429, "rate limited");
        assert!(rate_limited.retryable);

        let server_error = ProviderError::from_status(LlmProvider::OpenAI, 503, "overloaded");
        assert!(server_error.retryable);

        let bad_request = ProviderError::from_status(LlmProvider::Anthropic, 400, "bad request");
        assert!(!bad_request.retryable);

        let unauthorized = ProviderError::from_status(LlmProvider::OpenAI, 401, "bad key");
        assert!(!unauthorized.retryable);
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = ProviderError::transport(LlmProvider::Anthropic, "connection reset");
        assert!(err.retryable);
        assert_eq!(err.status_code, None);
    }
}
