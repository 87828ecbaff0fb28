//! Agent Tools
//!
//! The fixed tool set offered to agentic prompt invocations. Every side
//! effect goes through the run's [`ArtifactSink`], so tool output lands in
//! the same directory as the step artifacts.
//!
//! ## Tools
//!
//! - `write_class_content_to_file`: writes `entities/{class_name}.cs`
//! - `log_step`: logs a completed step
//! - `write_partial_result`: appends to `partials/{step_name}_{n}.md`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use crate::constants::output;
use crate::pipeline::artifacts::SharedSink;
use crate::types::{Result, WeaveError};

/// Tool description sent to the model
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// A side-effecting function the model may call
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: Value) -> Result<String>;
}

/// Ordered collection of tools offered to one agent run
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
    invocations: Arc<AtomicUsize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard tool set bound to a run's artifact sink
    pub fn standard(sink: SharedSink) -> Self {
        Self::new()
            .with(WriteClassContentTool { sink: sink.clone() })
            .with(LogStepTool)
            .with(WritePartialResultTool::new(sink))
    }

    pub fn with(mut self, tool: impl AgentTool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Same tools with a fresh invocation counter
    pub fn tracked(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            invocations: Arc::default(),
        }
    }

    /// Tool calls dispatched through this set (including failed ones)
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Call a tool by name
    pub async fn call(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition().name == name)
            .ok_or_else(|| WeaveError::Tool(format!("unknown tool '{}'", name)))?;

        self.invocations.fetch_add(1, Ordering::SeqCst);
        tool.call(args).await
    }

    /// Invoke a tool by name. Failures are reported back to the model as
    /// text instead of aborting the run.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        match self.call(name, args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                format!("error: {}", e)
            }
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| WeaveError::StructuredOutput {
        schema: tool.to_string(),
        message: e.to_string(),
    })
}

// =============================================================================
// write_class_content_to_file
// =============================================================================

pub struct WriteClassContentTool {
    sink: SharedSink,
}

#[derive(Deserialize)]
struct WriteClassArgs {
    class_name: String,
    class_content: String,
}

#[async_trait]
impl AgentTool for WriteClassContentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "write_class_content_to_file".to_string(),
            description: "Writes the content of a generated class to its own source file."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "class_name": {"type": "string", "description": "Name of the class"},
                    "class_content": {"type": "string", "description": "Full source of the class"}
                },
                "required": ["class_name", "class_content"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: WriteClassArgs = parse_args("write_class_content_to_file", args)?;
        let path = output::entity_file(&args.class_name)?;
        let written = self.sink.write(&path, &args.class_content).await?;
        Ok(format!("written {}", written))
    }
}

// =============================================================================
// log_step
// =============================================================================

pub struct LogStepTool;

#[derive(Deserialize)]
struct LogStepArgs {
    step_name: String,
}

#[async_trait]
impl AgentTool for LogStepTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "log_step".to_string(),
            description: "Logs the completion of a step.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "step_name": {"type": "string", "description": "Name of the step"}
                },
                "required": ["step_name"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: LogStepArgs = parse_args("log_step", args)?;
        info!("Agent step completed: {}", args.step_name);
        Ok("logged".to_string())
    }
}

// =============================================================================
// write_partial_result
// =============================================================================

/// Each call writes a new numbered file; the counter is per run.
pub struct WritePartialResultTool {
    sink: SharedSink,
    counter: AtomicUsize,
}

impl WritePartialResultTool {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
            counter: AtomicUsize::new(0),
        }
    }
}

#[derive(Deserialize)]
struct PartialResultArgs {
    step_name: String,
    partial_result: String,
}

#[async_trait]
impl AgentTool for WritePartialResultTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "write_partial_result".to_string(),
            description: "For each step executed, use this tool to write the partial result."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "step_name": {"type": "string", "description": "Name of the step"},
                    "partial_result": {"type": "string", "description": "Partial result of the step"}
                },
                "required": ["step_name", "partial_result"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: PartialResultArgs = parse_args("write_partial_result", args)?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = output::partial_file(&args.step_name, n)?;
        let written = self
            .sink
            .write(&path, &format!("{}\n", args.partial_result))
            .await?;
        Ok(format!("written {}", written))
    }
}
