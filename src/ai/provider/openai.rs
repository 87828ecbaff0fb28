//! OpenAI API Provider
//!
//! LLM provider using OpenAI's Chat Completions API. Supports free text,
//! JSON mode with the schema embedded in the system message, and a
//! tool-calling loop for agentic steps.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::ai::agent::ToolSet;
use crate::ai::prompt::{Prompt, Role};
use crate::ai::structured::extract_json;
use crate::types::{ErrorCategory, ErrorClassifier, LlmError, Result, WeaveError};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                WeaveError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                WeaveError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_messages(&self, prompt: &Prompt, schema: Option<&Value>) -> Vec<ChatMessage> {
        let system = match schema {
            None => prompt.system.clone(),
            Some(schema) => {
                let schema_str = serde_json::to_string_pretty(schema)
                    .unwrap_or_else(|_| schema.to_string());
                format!(
                    "{}\n\nAlways respond with valid JSON matching this schema:\n\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
                    prompt.system, schema_str
                )
            }
        };

        let mut messages = Vec::with_capacity(prompt.turns.len() + 1);
        if !system.is_empty() {
            messages.push(ChatMessage::text("system", system));
        }
        for turn in &prompt.turns {
            let role = match turn.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(ChatMessage::text(role, turn.content.clone()));
        }
        messages
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        json_mode: bool,
        tools: Option<Vec<ToolSpec>>,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            tools,
        }
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Sending request to OpenAI API ({} messages)", request.messages.len());

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER,
            )
            .into());
        }

        response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse OpenAI response: {}", e),
                PROVIDER,
            )
            .into()
        })
    }

    fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            model: self.model.clone(),
            provider: PROVIDER.to_string(),
        }
    }
}

fn first_message(body: ChatCompletionResponse) -> Result<(ResponseMessage, TokenUsage)> {
    let usage = body
        .usage
        .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                "No choices in OpenAI response",
                PROVIDER,
            )
        })?;

    Ok((message, usage))
}

/// Tool-calling loop. Each round sends the conversation so far; tool calls
/// in the answer are dispatched to `tools` and their output appended as
/// `tool` messages. Stops at the first answer without tool calls, or after
/// `recursion_limit` rounds with the last content seen.
async fn agent_loop<F, Fut>(
    mut messages: Vec<ChatMessage>,
    tools: &ToolSet,
    recursion_limit: usize,
    mut send: F,
) -> Result<(String, TokenUsage)>
where
    F: FnMut(Vec<ChatMessage>) -> Fut,
    Fut: Future<Output = Result<ChatCompletionResponse>>,
{
    let mut usage = TokenUsage::default();
    let mut last_content = String::new();

    for round in 0..recursion_limit.max(1) {
        let (message, round_usage) = first_message(send(messages.clone()).await?)?;
        usage.add(round_usage);

        if let Some(content) = &message.content {
            last_content = content.clone();
        }

        let calls = message.tool_calls.unwrap_or_default();
        if calls.is_empty() {
            return Ok((last_content, usage));
        }

        debug!("Agent round {}: {} tool calls", round + 1, calls.len());

        messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: message.content,
            tool_calls: Some(calls.clone()),
            tool_call_id: None,
        });

        for call in calls {
            let output = match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(args) => tools.invoke(&call.function.name, args).await,
                Err(e) => {
                    warn!(
                        "Agent sent malformed arguments for {}: {}",
                        call.function.name, e
                    );
                    format!(
                        "error: arguments for '{}' are not valid JSON: {}",
                        call.function.name, e
                    )
                }
            };
            messages.push(ChatMessage {
                role: "tool".to_string(),
                content: Some(output),
                tool_calls: None,
                tool_call_id: Some(call.id),
            });
        }
    }

    warn!(
        "Agent reached recursion limit ({}) without a final answer",
        recursion_limit
    );
    Ok((last_content, usage))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<LlmResponse> {
        debug!(
            "Completing with OpenAI (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(self.build_messages(prompt, None), false, None);
        let (message, usage) = first_message(self.send(&request).await?)?;

        let content = message.content.ok_or_else(|| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                "No content in OpenAI response",
                PROVIDER,
            )
        })?;

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(start_time.elapsed()),
            metadata: self.metadata(),
        })
    }

    async fn complete_structured(&self, prompt: &Prompt, schema: &Value) -> Result<Value> {
        debug!("Structured completion with OpenAI (model: {})", self.model);

        let request = self.build_request(self.build_messages(prompt, Some(schema)), true, None);
        let (message, _) = first_message(self.send(&request).await?)?;

        let content = message.content.ok_or_else(|| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                "No content in OpenAI response",
                PROVIDER,
            )
        })?;

        extract_json(&content)
    }

    async fn run_agent(
        &self,
        prompt: &Prompt,
        tools: &ToolSet,
        recursion_limit: usize,
    ) -> Result<LlmResponse> {
        info!(
            "Agent run with OpenAI (model: {}, tools: {}, limit: {})",
            self.model,
            tools.len(),
            recursion_limit
        );

        let start_time = Instant::now();
        let specs: Vec<ToolSpec> = tools
            .definitions()
            .into_iter()
            .map(|d| ToolSpec {
                tool_type: "function".to_string(),
                function: FunctionSpec {
                    name: d.name,
                    description: d.description,
                    parameters: d.parameters,
                },
            })
            .collect();

        let messages = self.build_messages(prompt, None);
        let (content, usage) = agent_loop(messages, tools, recursion_limit, |messages| {
            let request = self.build_request(messages, false, Some(specs.clone()));
            async move { self.send(&request).await }
        })
        .await?;

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(start_time.elapsed()),
            metadata: self.metadata(),
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    tool_type: String,
    function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
