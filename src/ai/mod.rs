//! AI Integration Layer
//!
//! Prompt model, provider abstraction and the helpers every LLM-backed step
//! shares: structured output parsing, agent tools, retries and token
//! estimation.

pub mod agent;
pub mod prompt;
pub mod provider;
pub mod structured;
pub mod timeout;
pub mod tokenizer;

pub use agent::{AgentTool, ToolDefinition, ToolSet};
pub use prompt::{Message, Prompt, PromptBuilder, PromptSection, Role};
pub use provider::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, RetryPolicy,
    RetryingProvider, SharedProvider, StepProviders, TokenUsage, UsageMeter, UsageSnapshot,
    create_provider, structured,
};
pub use structured::{OutputSchema, extract_json, parse_structured};
pub use timeout::with_timeout;
pub use tokenizer::{TokenCounter, TokenEstimator};
