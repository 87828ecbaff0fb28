//! Scripted provider for orchestration tests
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt
//! transcript (system message plus every turn). Unmatched prompts get the
//! default text.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{LlmProvider, LlmResponse};
use crate::ai::agent::ToolSet;
use crate::ai::prompt::Prompt;
use crate::types::{ErrorCategory, Result, WeaveError};

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Json(Value),
    Fail(String),
}

pub struct MockProvider {
    rules: Vec<(String, MockReply)>,
    default_text: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
    agent_runs: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_text: "mock response".to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            agent_runs: AtomicUsize::new(0),
        }
    }

    pub fn default_text(mut self, text: &str) -> Self {
        self.default_text = text.to_string();
        self
    }

    pub fn reply_text(mut self, needle: &str, text: &str) -> Self {
        self.rules
            .push((needle.to_string(), MockReply::Text(text.to_string())));
        self
    }

    pub fn reply_json(mut self, needle: &str, value: Value) -> Self {
        self.rules.push((needle.to_string(), MockReply::Json(value)));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            MockReply::Fail(format!("scripted failure for '{}'", needle)),
        ));
        self
    }

    /// Total prompt invocations (all modes)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn agent_runs(&self) -> usize {
        self.agent_runs.load(Ordering::SeqCst)
    }

    /// Every prompt received, in arrival order
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of received prompts whose transcript contains `needle`
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.prompts()
            .iter()
            .filter(|p| transcript(p).contains(needle))
            .count()
    }

    fn record(&self, prompt: &Prompt) -> Option<MockReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }

        let text = transcript(prompt);
        self.rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

fn transcript(prompt: &Prompt) -> String {
    let mut text = prompt.system.clone();
    for turn in &prompt.turns {
        text.push('\n');
        text.push_str(&turn.content);
    }
    text
}

fn scripted_failure(message: String) -> WeaveError {
    WeaveError::llm(ErrorCategory::BadRequest, message)
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<LlmResponse> {
        match self.record(prompt) {
            Some(MockReply::Text(text)) => Ok(LlmResponse::content_only(text)),
            Some(MockReply::Json(value)) => Ok(LlmResponse::content_only(value.to_string())),
            Some(MockReply::Fail(message)) => Err(scripted_failure(message)),
            None => Ok(LlmResponse::content_only(self.default_text.clone())),
        }
    }

    async fn complete_structured(&self, prompt: &Prompt, _schema: &Value) -> Result<Value> {
        match self.record(prompt) {
            Some(MockReply::Json(value)) => Ok(value),
            Some(MockReply::Text(text)) => Ok(serde_json::from_str(&text)?),
            Some(MockReply::Fail(message)) => Err(scripted_failure(message)),
            None => Err(WeaveError::StructuredOutput {
                schema: "mock".to_string(),
                message: "no scripted structured reply".to_string(),
            }),
        }
    }

    async fn run_agent(
        &self,
        prompt: &Prompt,
        _tools: &ToolSet,
        _recursion_limit: usize,
    ) -> Result<LlmResponse> {
        self.agent_runs.fetch_add(1, Ordering::SeqCst);
        self.complete(prompt).await
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
