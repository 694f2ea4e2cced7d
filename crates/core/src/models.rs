//! # Sitewright Models
//!
//! Centralized LLM provider and model-selection types. The router and both
//! vendor adapters depend on these; nothing here touches the network.

use serde::{Deserialize, Serialize};

/// Supported LLM providers.
///
/// Credentials come from the environment:
/// - Anthropic (Claude) - `ANTHROPIC_API_KEY`
/// - OpenAI (GPT) - `OPENAI_API_KEY`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
}

impl LlmProvider {
    /// Display name for logs and UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "Anthropic",
            LlmProvider::OpenAI => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// The vendor that owns a model identifier, by prefix convention.
    pub fn owner_of_model(model: &str) -> Option<LlmProvider> {
        if model.starts_with("claude") {
            Some(LlmProvider::Anthropic)
        } else if model.starts_with("gpt") || model.starts_with("o1") || model.starts_with("o3") {
            Some(LlmProvider::OpenAI)
        } else {
            None
        }
    }

    /// Default model when a request does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-sonnet-4-20250514",
            LlmProvider::OpenAI => "gpt-4o",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Task category used when picking a model without an explicit request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Long-form content generation (page copy, section text)
    Generation,
    /// Conversational command handling in the editor
    Chat,
    /// Site analysis and structured extraction
    Analysis,
    /// Cheap, low-latency lookups (labels, short rewrites)
    Quick,
}

/// Quality tier for model selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Fast,
    #[default]
    Balanced,
    Best,
}

/// Pure lookup from task category and quality tier to a model identifier.
/// No network access; the router resolves the owning provider afterwards.
pub fn select_model(task: TaskKind, quality: Quality) -> &'static str {
    match (task, quality) {
        (TaskKind::Generation, Quality::Best) => "claude-opus-4-20250514",
        (TaskKind::Generation, Quality::Balanced) => "claude-sonnet-4-20250514",
        (TaskKind::Generation, Quality::Fast) => "claude-3-5-haiku-20241022",
        (TaskKind::Chat, Quality::Best) => "claude-sonnet-4-20250514",
        (TaskKind::Chat, Quality::Balanced) => "claude-sonnet-4-20250514",
        (TaskKind::Chat, Quality::Fast) => "claude-3-5-haiku-20241022",
        (TaskKind::Analysis, Quality::Best) => "gpt-4o",
        (TaskKind::Analysis, Quality::Balanced) => "gpt-4o",
        (TaskKind::Analysis, Quality::Fast) => "gpt-4o-mini",
        (TaskKind::Quick, _) => "gpt-4o-mini",
    }
}

/// Configuration for one chat-model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            model: LlmProvider::Anthropic.default_model().to_string(),
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ownership_by_prefix() {
        assert_eq!(
            LlmProvider::owner_of_model("claude-sonnet-4-20250514"),
            Some(LlmProvider::Anthropic)
        );
        assert_eq!(
            LlmProvider::owner_of_model("gpt-4o-mini"),
            Some(LlmProvider::OpenAI)
        );
        assert_eq!(LlmProvider::owner_of_model("mistral-large"), None);
    }

    #[test]
    fn test_select_model_is_total() {
        for task in [
            TaskKind::Generation,
            TaskKind::Chat,
            TaskKind::Analysis,
            TaskKind::Quick,
        ] {
            for quality in [Quality::Fast, Quality::Balanced, Quality::Best] {
                let model = select_model(task, quality);
                assert!(LlmProvider::owner_of_model(model).is_some());
            }
        }
    }
}
