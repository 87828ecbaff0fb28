pub mod analyze;
pub mod config;
pub mod scene;

use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Command-line values that take precedence over every config source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_depth: Option<i32>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(depth) = self.max_depth {
            config.analysis.max_dependency_depth = depth;
        }
    }
}

/// Resolved configuration with CLI overrides applied and re-validated
pub fn load_config(overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = ConfigLoader::load()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
