//! LLM Provider Abstraction
//!
//! Defines the prompt capability consumed by every pipeline step: send a
//! system instruction plus turns, get back free text or a value matching a
//! declared schema. Providers may additionally support an agentic mode in
//! which the model invokes a fixed tool set before answering.
//!
//! ## Modules
//!
//! - `openai`: Chat Completions API (text, JSON, tool-calling agent loop)
//! - `ollama`: local models through the Ollama chat API
//! - `retry`: backon-based retry and timeout wrapper with usage accounting
//! - `routing`: per-step model overrides

#[cfg(test)]
pub mod mock;
mod ollama;
mod openai;
mod retry;
mod routing;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use retry::{RetryPolicy, RetryingProvider, UsageMeter, UsageSnapshot};
pub use routing::StepProviders;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::ai::agent::ToolSet;
use crate::ai::prompt::Prompt;
use crate::ai::structured::{OutputSchema, parse_structured};
use crate::types::{Result, WeaveError};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Free-text completion with usage metrics
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across pipeline steps.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are never serialized and are redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for LLM generation
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom or proxy endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    16_384
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: 300,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: default_max_tokens(),
        }
    }
}

impl ProviderConfig {
    /// Same provider settings with a different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..self.clone()
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// The prompt capability
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Free-text completion
    async fn complete(&self, prompt: &Prompt) -> Result<LlmResponse>;

    /// Completion constrained to the given JSON Schema
    async fn complete_structured(&self, prompt: &Prompt, schema: &Value) -> Result<Value>;

    /// Agentic completion: the model may call tools from `tools` for at most
    /// `recursion_limit` rounds before it must answer.
    ///
    /// Providers without tool support answer with a plain completion.
    async fn run_agent(
        &self,
        prompt: &Prompt,
        tools: &ToolSet,
        recursion_limit: usize,
    ) -> Result<LlmResponse> {
        debug!(
            "{} has no tool support, ignoring {} tools (limit {})",
            self.name(),
            tools.len(),
            recursion_limit
        );
        self.complete(prompt).await
    }

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Request a typed structured value from a provider
pub async fn structured<T: OutputSchema>(provider: &dyn LlmProvider, prompt: &Prompt) -> Result<T> {
    let value = provider.complete_structured(prompt, &T::schema()).await?;
    parse_structured(value)
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(WeaveError::Config(format!(
            "Unknown provider: {}. Supported: openai, ollama",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage::from_openai(100, 50);
        usage.add(TokenUsage::from_ollama(10, 5));
        assert_eq!(usage.total(), 165);
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_with_model_keeps_other_settings() {
        let config = ProviderConfig {
            timeout_secs: 42,
            ..Default::default()
        };
        let routed = config.with_model("gpt-4.1");
        assert_eq!(routed.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(routed.timeout_secs, 42);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = ProviderConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(WeaveError::Config(_))
        ));
    }
}
