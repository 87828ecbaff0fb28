//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Fan-out concurrency defaults (maximum in-flight prompt calls)
pub mod concurrency {
    /// Per-procedure ER diagram generation
    pub const DATABASE_MODEL: usize = 10;

    /// Per-procedure and per-app-file use case extraction
    pub const USE_CASES: usize = 10;

    /// Sequence and flow diagram generation
    pub const DIAGRAMS: usize = 2;

    /// Per-table entity generation
    pub const ENTITIES: usize = 10;
}

/// LLM invocation constants
pub mod llm {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Total attempts per prompt invocation
    pub const DEFAULT_RETRY_ATTEMPTS: usize = 1;

    /// Fixed delay between attempts (seconds)
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

    /// Maximum tool-call rounds for agentic invocations
    pub const AGENT_RECURSION_LIMIT: usize = 100;

    /// Procedures larger than this are logged as likely to overflow the context
    pub const CONTEXT_WARN_TOKENS: usize = 100_000;
}

/// Dependency walk constants
pub mod analysis {
    /// Unlimited procedure dependency depth
    pub const UNLIMITED_DEPTH: i32 = -1;

    /// Business code expansion depth (entry procedure only)
    pub const BUSINESS_DEPENDENCY_DEPTH: i32 = 0;
}

/// Output file names and artifact paths
pub mod output {
    use crate::types::{Result, WeaveError};

    pub const DATABASE_MODEL: &str = "database_model.md";
    pub const USE_CASES: &str = "use_cases_documentation.md";
    pub const SEQUENCE_DIAGRAM: &str = "sequence_diagram.md";
    pub const FLOW_DIAGRAM: &str = "flow_diagram.md";
    pub const ENTITIES: &str = "entities_code.md";
    pub const DBCONTEXT: &str = "dbcontext_code.md";
    pub const BUSINESS: &str = "business_code.md";

    pub const TIMELINE_REPORT: &str = "TIMELINE_REPORT.md";
    pub const SUMMARY_TABLE: &str = "SUMMARY_TABLE.md";

    pub const ENTITIES_DIR: &str = "entities";
    pub const PARTIALS_DIR: &str = "partials";

    /// Default run directory timestamp format (chrono strftime)
    pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Relative path of a generated class file
    pub fn entity_file(class_name: &str) -> Result<String> {
        Ok(format!(
            "{}/{}.cs",
            ENTITIES_DIR,
            safe_component(class_name)?
        ))
    }

    /// Relative path of the n-th partial result of a step
    pub fn partial_file(step_name: &str, n: usize) -> Result<String> {
        Ok(format!(
            "{}/{}_{}.md",
            PARTIALS_DIR,
            safe_component(step_name)?,
            n
        ))
    }

    /// Reject names that would escape the output directory
    fn safe_component(name: &str) -> Result<&str> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(WeaveError::Artifact(format!(
                "invalid file name component: {:?}",
                name
            )));
        }
        Ok(name)
    }
}

/// Config file locations
pub mod config {
    /// Project-local config directory
    pub const PROJECT_DIR: &str = ".procweave";

    /// Config file name (global and project)
    pub const FILE_NAME: &str = "config.toml";

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "PROCWEAVE_";
}
