//! Code Generation Phase
//!
//! ```text
//! tables ──fan-out──→ EntityClass ──→ entities_code.md + entities/{name}.cs
//! entity signatures + database model ──agent──→ dbcontext_code.md
//! entry procedure ──→ CodeResult ──next_implementation──→ ... ──→ business_code.md
//! ```
//!
//! All three steps are off by default.

pub mod business;
pub mod entities;
pub mod prompts;

pub use business::BusinessStep;
pub use entities::{DbContextStep, EntitiesStep};

use crate::ai::{StepProviders, ToolSet};
use crate::config::{AnalysisConfig, ConcurrencyConfig};
use crate::pipeline::{Phase, PhaseKind, SharedSink};

pub fn phase(
    providers: &StepProviders,
    concurrency: &ConcurrencyConfig,
    analysis: &AnalysisConfig,
    sink: SharedSink,
) -> Phase {
    let tools = ToolSet::standard(sink);

    Phase::new(PhaseKind::CodeGeneration)
        .step(EntitiesStep {
            provider: providers.backend_entities.clone(),
            concurrency: concurrency.entities,
            renames: analysis.table_renames.clone(),
            tools: tools.clone(),
        })
        .step(DbContextStep {
            provider: providers.backend_entities.clone(),
            tools,
            recursion_limit: analysis.agent_recursion_limit,
        })
        .step(BusinessStep {
            provider: providers.backend_business.clone(),
            max_depth: analysis.business_max_dependency_depth,
        })
}
