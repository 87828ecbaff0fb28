//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, e.g. ~/.config/procweave/config.toml)
//! 3. Project config (.procweave/config.toml)
//! 4. Environment variables (PROCWEAVE_* prefix, `__` separates sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants::config as paths;
use crate::types::{Result, WeaveError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let figment = Self::figment(Self::global_config_path(), Self::project_config_path());

        let config: Config = figment
            .extract()
            .map_err(|e| WeaveError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| WeaveError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn figment(global: Option<PathBuf>, project: PathBuf) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(&project));
        }

        // PROCWEAVE_LLM__MODEL -> llm.model
        figment.merge(Env::prefixed(paths::ENV_PREFIX).split("__").lowercase(true))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "procweave").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(paths::FILE_NAME))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join(paths::FILE_NAME)
    }

    /// Get project config directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(paths::PROJECT_DIR)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render a configuration as text (TOML), JSON or YAML
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            _ => toml::to_string_pretty(config).map_err(|e| WeaveError::Config(e.to_string())),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file. Existing files are kept unless `force`.
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let config_path = if global {
            Self::global_config_path().ok_or_else(|| {
                WeaveError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        Self::write_default(&config_path, force)?;
        Ok(config_path)
    }

    fn write_default(config_path: &Path, force: bool) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !config_path.exists() || force {
            fs::write(config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    /// Default config content (TOML)
    fn default_config() -> String {
        r#"# procweave configuration
# Project settings in .procweave/config.toml override global ones.
# Environment variables override both, e.g. PROCWEAVE_LLM__MODEL=gpt-4o.

version = "1.0"

[llm]
provider = "openai"
timeout_secs = 300
temperature = 0.0
retry_attempts = 1
retry_delay_secs = 10

# Per-step model overrides
[models]
# database_diagrams = "gpt-4o"
# use_cases = "gpt-4o"
# backend_entities = "gpt-4o-mini"
# backend_business = "gpt-4o"
# scene = "gpt-4o"

[features]
database_model = true
use_case_from_procedure = true
use_case_from_app_file = true
use_case_consolidation = true
use_case_sequence_diagram = true
use_case_flow_diagram = true
backend_entities = false
backend_dbcontext = false
backend_business = false

[concurrency]
database_model = 10
use_cases = 10
diagrams = 2
entities = 10

[analysis]
max_dependency_depth = -1
use_tables_in_procedure_analysis = false
sanitize_procedures = true
business_max_dependency_depth = 0
agent_recursion_limit = 100

[analysis.table_renames]
# t200_mm_companias = "Companies"
"#
        .to_string()
    }
}
