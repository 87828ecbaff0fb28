//! Documentation Phase
//!
//! ## Architecture
//!
//! ```text
//! analyses ──fan-out──→ ER fragments ──consolidate──→ database_model.md
//! analyses ──fan-out──┐
//! app files ─fan-out──┴→ use cases ──consolidate──→ use_cases_documentation.md
//!                                        └──→ sequence_diagram.md + flow_diagram.md
//! ```

pub mod database_model;
pub mod prompts;
pub mod use_cases;

pub use database_model::DatabaseModelStep;
pub use use_cases::{
    UseCaseConsolidationStep, UseCaseDiagramsStep, UseCaseFromAppFileStep,
    UseCaseFromProcedureStep,
};

use crate::ai::StepProviders;
use crate::config::{ConcurrencyConfig, FeatureToggles};
use crate::pipeline::{Phase, PhaseKind};

pub fn phase(
    providers: &StepProviders,
    concurrency: &ConcurrencyConfig,
    features: &FeatureToggles,
) -> Phase {
    Phase::new(PhaseKind::Documentation)
        .step(DatabaseModelStep {
            provider: providers.database_diagrams.clone(),
            concurrency: concurrency.database_model,
        })
        .step(UseCaseFromProcedureStep {
            provider: providers.use_cases.clone(),
            concurrency: concurrency.use_cases,
        })
        .step(UseCaseFromAppFileStep {
            provider: providers.use_cases.clone(),
            concurrency: concurrency.use_cases,
        })
        .step(UseCaseConsolidationStep {
            provider: providers.use_cases.clone(),
        })
        .step(UseCaseDiagramsStep::new(
            providers.use_cases.clone(),
            concurrency.diagrams,
            features,
        ))
}
