//! procweave - LLM-Driven Legacy SQL Documentation Pipeline
//!
//! Walks a stored procedure call tree from an entry procedure, documents the
//! database model and business use cases with an LLM, and optionally
//! generates Entity Framework entities, a DbContext and business classes.
//!
//! ## Architecture
//!
//! ```text
//! Preparation ──→ Documentation ──→ CodeGeneration
//!  (no LLM)        fan-out + consolidation   structured output + agent tools
//! ```
//!
//! Every phase is a list of [`pipeline::Step`]s run against one
//! [`pipeline::SharedContext`]. A failing step is logged and the run goes on.
//!
//! ## Modules
//!
//! - [`pipeline`]: phases, steps, fan-out runner, consolidation, graph walker
//! - [`preparation`]: file mapping, SQL sanitizing, table and procedure parsing
//! - [`documentation`]: database model and use-case documentation steps
//! - [`codegen`]: entity, DbContext and business code generation steps
//! - [`scene`]: Unity timeline scene reports
//! - [`ai`]: prompt model, providers, retries, agent tools
//! - [`config`]: layered configuration and feature toggles

pub mod ai;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod constants;
pub mod documentation;
pub mod pipeline;
pub mod preparation;
pub mod scene;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, FeatureToggles};
pub use types::error::{ErrorCategory, Result, ResultExt, WeaveError};

pub use pipeline::{
    ArtifactSink, ArtifactSlot, FsArtifactSink, Phase, PhaseKind, Pipeline, PipelineReport,
    RunInputs, SharedContext, Step, StepOutcome,
};

pub use ai::{LlmProvider, LlmResponse, SharedProvider, StepProviders, with_timeout};
