//! Retry and Timeout Wrapper
//!
//! Wraps any provider with a constant-delay retry policy (backon) and a
//! per-attempt timeout. Only retryable errors are repeated; auth and bad
//! request failures surface immediately. Token usage across all wrapped
//! calls is accumulated in a shared [`UsageMeter`].

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

use super::{LlmProvider, LlmResponse, SharedProvider, TokenUsage};
use crate::ai::agent::ToolSet;
use crate::ai::prompt::Prompt;
use crate::ai::timeout::with_timeout;
use crate::types::{Result, WeaveError};

/// How many times a prompt invocation is attempted and how long to wait
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub attempts: usize,
    /// Fixed delay between attempts
    pub delay: Duration,
    /// Upper bound for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    fn builder(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.attempts.saturating_sub(1))
    }
}

// =============================================================================
// Usage Meter
// =============================================================================

/// Thread-safe accumulator for calls and token usage
#[derive(Debug, Default)]
pub struct UsageMeter {
    calls: AtomicU64,
    failures: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

/// Point-in-time copy of a [`UsageMeter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageMeter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record_success(&self, usage: TokenUsage) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(u64::from(usage.input_tokens), Ordering::Relaxed);
        self.output_tokens
            .fetch_add(u64::from(usage.output_tokens), Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Retrying Provider
// =============================================================================

/// Provider decorator adding retries, timeouts and usage accounting
pub struct RetryingProvider {
    inner: SharedProvider,
    policy: RetryPolicy,
    meter: Arc<UsageMeter>,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, policy: RetryPolicy, meter: Arc<UsageMeter>) -> Self {
        Self {
            inner,
            policy,
            meter,
        }
    }

    /// Wrap and share in one step
    pub fn shared(inner: SharedProvider, policy: RetryPolicy, meter: Arc<UsageMeter>) -> SharedProvider {
        Arc::new(Self::new(inner, policy, meter))
    }

    fn record<T>(&self, result: &Result<T>, usage: impl FnOnce(&T) -> TokenUsage) {
        match result {
            Ok(value) => self.meter.record_success(usage(value)),
            Err(_) => self.meter.record_failure(),
        }
    }
}

fn notify_retry(provider: &str, operation: &'static str) -> impl Fn(&WeaveError, Duration) {
    let provider = provider.to_string();
    move |err: &WeaveError, delay: Duration| {
        warn!(
            "{} {} failed, retrying in {:?}: {}",
            provider, operation, delay, err
        );
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<LlmResponse> {
        let inner = &self.inner;
        let timeout = self.policy.timeout;

        let result = (move || async move {
            with_timeout(timeout, inner.complete(prompt), "LLM completion").await
        })
        .retry(self.policy.builder())
        .when(|e: &WeaveError| e.is_retryable())
        .notify(notify_retry(self.inner.name(), "completion"))
        .await;

        self.record(&result, |r| r.usage);
        result
    }

    async fn complete_structured(&self, prompt: &Prompt, schema: &Value) -> Result<Value> {
        let inner = &self.inner;
        let timeout = self.policy.timeout;

        let result = (move || async move {
            with_timeout(
                timeout,
                inner.complete_structured(prompt, schema),
                "LLM structured completion",
            )
            .await
        })
        .retry(self.policy.builder())
        .when(|e: &WeaveError| e.is_retryable())
        .notify(notify_retry(self.inner.name(), "structured completion"))
        .await;

        self.record(&result, |_| TokenUsage::default());
        result
    }

    async fn run_agent(
        &self,
        prompt: &Prompt,
        tools: &ToolSet,
        recursion_limit: usize,
    ) -> Result<LlmResponse> {
        let inner = &self.inner;
        let timeout = self.policy.timeout;
        // Tool calls have side effects, so a run is only repeated while none happened
        let tracked = tools.tracked();
        let tools = &tracked;

        let result = (move || async move {
            with_timeout(
                timeout,
                inner.run_agent(prompt, tools, recursion_limit),
                "LLM agent run",
            )
            .await
        })
        .retry(self.policy.builder())
        .when(|e: &WeaveError| {
            let replayable = tracked.invocations() == 0;
            if !replayable && e.is_retryable() {
                warn!(
                    "{} agent run failed after {} tool calls, not retrying",
                    self.inner.name(),
                    tracked.invocations()
                );
            }
            replayable && e.is_retryable()
        })
        .notify(notify_retry(self.inner.name(), "agent run"))
        .await;

        self.record(&result, |r| r.usage);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use std::sync::atomic::AtomicUsize;

    /// Fails with the given category until `fail_times` calls have been made
    struct FlakyProvider {
        calls: AtomicUsize,
        fail_times: usize,
        category: ErrorCategory,
    }

    impl FlakyProvider {
        fn new(fail_times: usize, category: ErrorCategory) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_times,
                category,
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn complete(&self, _prompt: &Prompt) -> Result<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(WeaveError::llm(self.category, "flaky"))
            } else {
                Ok(LlmResponse {
                    content: "ok".to_string(),
                    usage: TokenUsage::from_openai(10, 5),
                    ..Default::default()
                })
            }
        }

        async fn complete_structured(&self, _prompt: &Prompt, _schema: &Value) -> Result<Value> {
            Ok(Value::Null)
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-1"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn policy(attempts: usize) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let flaky = FlakyProvider::new(2, ErrorCategory::Transient);
        let meter = UsageMeter::new();
        let provider = RetryingProvider::new(flaky.clone(), policy(3), meter.clone());

        let response = provider.complete(&Prompt::new("s")).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);

        let snapshot = meter.snapshot();
        assert_eq!(snapshot.calls, 1);
        assert_eq!(snapshot.input_tokens, 10);
        assert_eq!(snapshot.output_tokens, 5);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let flaky = FlakyProvider::new(1, ErrorCategory::Transient);
        let meter = UsageMeter::new();
        let provider = RetryingProvider::new(flaky.clone(), policy(1), meter.clone());

        assert!(provider.complete(&Prompt::new("s")).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
        assert_eq!(meter.snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_auth_errors_fail_fast() {
        let flaky = FlakyProvider::new(1, ErrorCategory::Auth);
        let provider = RetryingProvider::new(flaky.clone(), policy(5), UsageMeter::new());

        assert!(provider.complete(&Prompt::new("s")).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    /// Agent that optionally calls `log_step` before failing transiently
    struct FailingAgent {
        runs: AtomicUsize,
        call_tool_first: bool,
    }

    #[async_trait]
    impl LlmProvider for FailingAgent {
        async fn complete(&self, _prompt: &Prompt) -> Result<LlmResponse> {
            Ok(LlmResponse::content_only("ok"))
        }

        async fn complete_structured(&self, _prompt: &Prompt, _schema: &Value) -> Result<Value> {
            Ok(Value::Null)
        }

        async fn run_agent(
            &self,
            _prompt: &Prompt,
            tools: &ToolSet,
            _recursion_limit: usize,
        ) -> Result<LlmResponse> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.call_tool_first {
                tools
                    .invoke("log_step", serde_json::json!({"step_name": "entities"}))
                    .await;
            }
            Err(WeaveError::llm(ErrorCategory::Transient, "connection reset"))
        }

        fn name(&self) -> &str {
            "agent"
        }

        fn model(&self) -> &str {
            "agent-1"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_agent_run_not_repeated_after_tool_call() {
        let agent = Arc::new(FailingAgent {
            runs: AtomicUsize::new(0),
            call_tool_first: true,
        });
        let provider = RetryingProvider::new(agent.clone(), policy(3), UsageMeter::new());
        let tools = ToolSet::new().with(crate::ai::agent::LogStepTool);

        assert!(provider.run_agent(&Prompt::new("s"), &tools, 5).await.is_err());
        assert_eq!(agent.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_agent_run_repeated_before_any_tool_call() {
        let agent = Arc::new(FailingAgent {
            runs: AtomicUsize::new(0),
            call_tool_first: false,
        });
        let provider = RetryingProvider::new(agent.clone(), policy(3), UsageMeter::new());
        let tools = ToolSet::new().with(crate::ai::agent::LogStepTool);

        assert!(provider.run_agent(&Prompt::new("s"), &tools, 5).await.is_err());
        assert_eq!(agent.runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_policy_is_single_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_secs(10));
    }
}
