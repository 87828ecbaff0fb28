//! Per-step model routing
//!
//! Consolidation and code generation calls usually want a larger model than
//! per-item fan-out. Each step family gets its own provider, built from the
//! default provider settings with the configured model override. Steps
//! without an override share the default provider.

use std::sync::Arc;
use tracing::info;

use super::{ProviderConfig, RetryPolicy, RetryingProvider, SharedProvider, UsageMeter, create_provider};
use crate::config::Config;
use crate::types::Result;

#[derive(Clone)]
pub struct StepProviders {
    pub default: SharedProvider,
    pub database_diagrams: SharedProvider,
    pub use_cases: SharedProvider,
    pub backend_entities: SharedProvider,
    pub backend_business: SharedProvider,
    pub scene: SharedProvider,
}

impl StepProviders {
    /// Same provider for every step
    pub fn uniform(provider: SharedProvider) -> Self {
        Self {
            database_diagrams: provider.clone(),
            use_cases: provider.clone(),
            backend_entities: provider.clone(),
            backend_business: provider.clone(),
            scene: provider.clone(),
            default: provider,
        }
    }

    /// Build retrying providers for every configured model, sharing one usage meter
    pub fn from_config(config: &Config, meter: Arc<UsageMeter>) -> Result<Self> {
        let base = config.provider_config();
        let policy = config.retry_policy();
        let default = build(&base, &policy, &meter)?;

        let route = |model: &Option<String>| -> Result<SharedProvider> {
            match model {
                Some(model) => {
                    info!("Routing override model {}", model);
                    build(&base.with_model(model), &policy, &meter)
                }
                None => Ok(default.clone()),
            }
        };

        Ok(Self {
            database_diagrams: route(&config.models.database_diagrams)?,
            use_cases: route(&config.models.use_cases)?,
            backend_entities: route(&config.models.backend_entities)?,
            backend_business: route(&config.models.backend_business)?,
            scene: route(&config.models.scene)?,
            default,
        })
    }
}

fn build(
    config: &ProviderConfig,
    policy: &RetryPolicy,
    meter: &Arc<UsageMeter>,
) -> Result<SharedProvider> {
    let inner = create_provider(config)?;
    Ok(RetryingProvider::shared(inner, *policy, meter.clone()))
}
