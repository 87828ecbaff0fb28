//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global and project (.procweave/) level configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::ai::{ProviderConfig, RetryPolicy};
use crate::constants::{analysis, concurrency, llm, output};
use crate::types::{Result, WeaveError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Per-step model overrides
    pub models: ModelOverrides,

    /// Which pipeline steps run
    pub features: FeatureToggles,

    /// Fan-out limits
    pub concurrency: ConcurrencyConfig,

    /// Procedure analysis settings
    pub analysis: AnalysisConfig,

    /// Output directory layout
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            models: ModelOverrides::default(),
            features: FeatureToggles::default(),
            concurrency: ConcurrencyConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `WeaveError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(WeaveError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(WeaveError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.retry_attempts == 0 {
            return Err(WeaveError::Config(
                "LLM retry_attempts must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("database_model", self.concurrency.database_model),
            ("use_cases", self.concurrency.use_cases),
            ("diagrams", self.concurrency.diagrams),
            ("entities", self.concurrency.entities),
        ] {
            if value == 0 {
                return Err(WeaveError::Config(format!(
                    "concurrency.{} must be greater than 0",
                    name
                )));
            }
        }

        for (name, depth) in [
            ("max_dependency_depth", self.analysis.max_dependency_depth),
            (
                "business_max_dependency_depth",
                self.analysis.business_max_dependency_depth,
            ),
        ] {
            if depth < analysis::UNLIMITED_DEPTH {
                return Err(WeaveError::Config(format!(
                    "analysis.{} must be -1 (unlimited) or >= 0, got {}",
                    name, depth
                )));
            }
        }

        if self.analysis.agent_recursion_limit == 0 {
            return Err(WeaveError::Config(
                "analysis.agent_recursion_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Provider settings for the default model
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.llm.provider.clone(),
            model: self.llm.model.clone(),
            timeout_secs: self.llm.timeout_secs,
            temperature: self.llm.temperature,
            api_key: None,
            api_base: self.llm.api_base.clone(),
            max_tokens: self.llm.max_tokens,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.llm.retry_attempts,
            delay: Duration::from_secs(self.llm.retry_delay_secs),
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or "ollama")
    pub provider: String,

    /// Default model (provider default when unset)
    pub model: Option<String>,

    /// Custom API endpoint
    pub api_base: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Total attempts per prompt invocation
    pub retry_attempts: usize,

    /// Delay between attempts in seconds
    pub retry_delay_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_base: None,
            timeout_secs: llm::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_tokens: 16_384,
            retry_attempts: llm::DEFAULT_RETRY_ATTEMPTS,
            retry_delay_secs: llm::DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

/// Model used by each step family; `None` falls back to `llm.model`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOverrides {
    pub database_diagrams: Option<String>,
    pub use_cases: Option<String>,
    pub backend_entities: Option<String>,
    pub backend_business: Option<String>,
    pub scene: Option<String>,
}

// =============================================================================
// Feature Toggles
// =============================================================================

/// Enables or disables individual pipeline steps.
///
/// Passed explicitly to every step; there is no global switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub database_model: bool,
    pub use_case_from_procedure: bool,
    pub use_case_from_app_file: bool,
    pub use_case_consolidation: bool,
    pub use_case_sequence_diagram: bool,
    pub use_case_flow_diagram: bool,
    pub backend_entities: bool,
    pub backend_dbcontext: bool,
    pub backend_business: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            database_model: true,
            use_case_from_procedure: true,
            use_case_from_app_file: true,
            use_case_consolidation: true,
            use_case_sequence_diagram: true,
            use_case_flow_diagram: true,
            backend_entities: false,
            backend_dbcontext: false,
            backend_business: false,
        }
    }
}

impl FeatureToggles {
    /// Everything enabled
    pub fn all() -> Self {
        Self {
            backend_entities: true,
            backend_dbcontext: true,
            backend_business: true,
            ..Self::default()
        }
    }

    /// Everything disabled
    pub fn none() -> Self {
        Self {
            database_model: false,
            use_case_from_procedure: false,
            use_case_from_app_file: false,
            use_case_consolidation: false,
            use_case_sequence_diagram: false,
            use_case_flow_diagram: false,
            backend_entities: false,
            backend_dbcontext: false,
            backend_business: false,
        }
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub database_model: usize,
    pub use_cases: usize,
    pub diagrams: usize,
    pub entities: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            database_model: concurrency::DATABASE_MODEL,
            use_cases: concurrency::USE_CASES,
            diagrams: concurrency::DIAGRAMS,
            entities: concurrency::ENTITIES,
        }
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Procedure dependency walk depth (-1 = unlimited)
    pub max_dependency_depth: i32,

    /// Append referenced table DDL to each walked procedure
    pub use_tables_in_procedure_analysis: bool,

    /// Strip drop guards, block comments and blank lines from procedures
    pub sanitize_procedures: bool,

    /// Business code dependency expansion depth (-1 = unlimited)
    pub business_max_dependency_depth: i32,

    /// Maximum tool-call rounds for agentic steps
    pub agent_recursion_limit: usize,

    /// Legacy table name → new table name, applied to generated entities
    pub table_renames: BTreeMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_dependency_depth: analysis::UNLIMITED_DEPTH,
            use_tables_in_procedure_analysis: false,
            sanitize_procedures: true,
            business_max_dependency_depth: analysis::BUSINESS_DEPENDENCY_DEPTH,
            agent_recursion_limit: llm::AGENT_RECURSION_LIMIT,
            table_renames: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// chrono format for the per-run directory name
    pub timestamp_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            timestamp_format: output::DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.retry_attempts, 1);
        assert_eq!(config.concurrency.diagrams, 2);
        assert_eq!(config.analysis.max_dependency_depth, -1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_toggles() {
        let toggles = FeatureToggles::default();
        assert!(toggles.database_model);
        assert!(toggles.use_case_flow_diagram);
        assert!(!toggles.backend_entities);
        assert!(!toggles.backend_business);

        assert!(FeatureToggles::all().backend_dbcontext);
        assert!(!FeatureToggles::none().use_case_consolidation);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.concurrency.entities = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency.entities"));
    }

    #[test]
    fn test_validate_rejects_bad_depth() {
        let mut config = Config::default();
        config.analysis.max_dependency_depth = -2;
        assert!(config.validate().is_err());

        config.analysis.max_dependency_depth = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[features]
backend_entities = true

[analysis.table_renames]
t_emp = "Employees"
"#,
        )
        .unwrap();

        assert!(config.features.backend_entities);
        assert!(config.features.database_model);
        assert_eq!(config.concurrency.database_model, 10);
        assert_eq!(
            config.analysis.table_renames.get("t_emp").map(String::as_str),
            Some("Employees")
        );
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_secs(10));
    }
}
