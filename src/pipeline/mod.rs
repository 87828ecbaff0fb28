//! Phase/Step Pipeline
//!
//! A [`Pipeline`] is an ordered list of [`Phase`]s, each an ordered list of
//! [`Step`]s, all run against one [`SharedContext`].
//!
//! ## Architecture
//!
//! ```text
//! Pipeline ─→ Phase ─→ Step ─→ (fan-out | consolidation | graph walk) ─→ LlmProvider
//!                       │
//!                       └─→ pending artifact slots ─→ ArtifactSink
//! ```
//!
//! ## Guarantees
//!
//! - Steps and phases run strictly in sequence.
//! - A step whose feature toggle is off is skipped without touching the context.
//! - A failing step is logged and the run continues with the next step.
//! - Slots assigned by a step are published after it returns, even if it failed.

pub mod artifacts;
pub mod consolidation;
pub mod context;
pub mod fanout;
pub mod graph;

pub use artifacts::{ArtifactSink, FsArtifactSink, MemorySink, SharedSink};
pub use consolidation::{Consolidation, consolidate, join_fragments};
pub use context::{ArtifactSlot, Artifacts, RunInputs, SharedContext, procedure_name_from_file};
pub use fanout::{FanOutReport, ItemFailure, run_parallel};
pub use graph::{Dependent, Walk, collect_with_dependencies};

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::FeatureToggles;
use crate::types::Result;

// =============================================================================
// Step
// =============================================================================

/// A named unit of work against the shared context
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the step's feature toggle allows it to run
    fn enabled(&self, _features: &FeatureToggles) -> bool {
        true
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()>;
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Preparation,
    Documentation,
    CodeGeneration,
    SceneReport,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparation => write!(f, "Preparation"),
            Self::Documentation => write!(f, "Documentation"),
            Self::CodeGeneration => write!(f, "CodeGeneration"),
            Self::SceneReport => write!(f, "SceneReport"),
        }
    }
}

/// Ordered steps of one stage
pub struct Phase {
    pub kind: PhaseKind,
    steps: Vec<Box<dyn Step>>,
}

impl Phase {
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

// =============================================================================
// Report
// =============================================================================

/// How one step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub phase: PhaseKind,
    pub step: &'static str,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub steps: Vec<StepRecord>,
    /// Locations of published artifacts
    pub published: Vec<String>,
    pub elapsed: Duration,
}

impl PipelineReport {
    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Completed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Ordered phases plus the toggles and sink every step shares
pub struct Pipeline {
    phases: Vec<Phase>,
    features: FeatureToggles,
    sink: SharedSink,
}

impl Pipeline {
    pub fn new(features: FeatureToggles, sink: SharedSink) -> Self {
        Self {
            phases: Vec::new(),
            features,
            sink,
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Run every phase in order. Never fails: step errors end up in the report.
    pub async fn run(&self, ctx: &mut SharedContext) -> PipelineReport {
        let started = Instant::now();
        let mut report = PipelineReport::default();

        info!(
            "Pipeline: Starting run {} ({} phases, output={})",
            ctx.run_id,
            self.phases.len(),
            self.sink.location()
        );

        for phase in &self.phases {
            self.run_phase(phase, ctx, &mut report)
                .instrument(info_span!("phase", phase = %phase.kind))
                .await;
        }

        report.elapsed = started.elapsed();
        info!(
            "Pipeline: Complete in {:.2}s ({} completed, {} skipped, {} failed, {} artifacts)",
            report.elapsed.as_secs_f64(),
            report.completed(),
            report.skipped(),
            report.failed(),
            report.published.len()
        );
        report
    }

    async fn run_phase(&self, phase: &Phase, ctx: &mut SharedContext, report: &mut PipelineReport) {
        info!("Phase {}: Starting ({} steps)", phase.kind, phase.steps.len());

        for step in &phase.steps {
            let started = Instant::now();

            let outcome = if !step.enabled(&self.features) {
                info!("Step {}: Skipped (feature disabled)", step.name());
                StepOutcome::Skipped
            } else {
                let result = step
                    .run(ctx)
                    .instrument(info_span!("step", step = step.name()))
                    .await;

                match result {
                    Ok(()) => {
                        info!(
                            "Step {}: Complete ({:.2}s)",
                            step.name(),
                            started.elapsed().as_secs_f64()
                        );
                        StepOutcome::Completed
                    }
                    Err(e) => {
                        error!("Step {} failed: {}", step.name(), e);
                        StepOutcome::Failed(e.to_string())
                    }
                }
            };

            self.publish(ctx, report).await;

            report.steps.push(StepRecord {
                phase: phase.kind,
                step: step.name(),
                outcome,
                elapsed: started.elapsed(),
            });
        }
    }

    async fn publish(&self, ctx: &mut SharedContext, report: &mut PipelineReport) {
        for (slot, content) in ctx.artifacts.take_pending() {
            match self.sink.write(slot.file_name(), &content).await {
                Ok(location) => {
                    info!("Published {}", location);
                    report.published.push(location);
                }
                Err(e) => warn!("Failed to publish {}: {}", slot, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeaveError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SetSlot {
        name: &'static str,
        slot: ArtifactSlot,
        text: &'static str,
    }

    #[async_trait]
    impl Step for SetSlot {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
            ctx.artifacts.set(self.slot, self.text);
            Ok(())
        }
    }

    /// Assigns a slot, then fails
    struct Failing;

    #[async_trait]
    impl Step for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
            ctx.artifacts.set(ArtifactSlot::UseCases, "partial");
            Err(WeaveError::step("Failing", "always fails"))
        }
    }

    struct Toggled {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Step for Toggled {
        fn name(&self) -> &'static str {
            "Toggled"
        }

        fn enabled(&self, features: &FeatureToggles) -> bool {
            features.backend_business
        }

        async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.entities.clear();
            ctx.tables_source.push_str("touched");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_phase_does_not_stop_pipeline() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(FeatureToggles::default(), sink.clone())
            .phase(Phase::new(PhaseKind::Preparation).step(SetSlot {
                name: "First",
                slot: ArtifactSlot::DatabaseModel,
                text: "phase1",
            }))
            .phase(Phase::new(PhaseKind::Documentation).step(Failing))
            .phase(Phase::new(PhaseKind::CodeGeneration).step(SetSlot {
                name: "Third",
                slot: ArtifactSlot::Business,
                text: "phase3",
            }));

        let mut ctx = SharedContext::new(RunInputs::default());
        let report = pipeline.run(&mut ctx).await;

        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(ctx.artifacts.get(ArtifactSlot::DatabaseModel), Some("phase1"));
        assert_eq!(ctx.artifacts.get(ArtifactSlot::Business), Some("phase3"));

        assert_eq!(sink.get("database_model.md").as_deref(), Some("phase1"));
        assert_eq!(sink.get("business_code.md").as_deref(), Some("phase3"));
        // Partial output of the failed step is still published
        assert_eq!(sink.get("use_cases_documentation.md").as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn test_failing_step_leaves_untouched_slots_empty() {
        let pipeline = Pipeline::new(FeatureToggles::default(), Arc::new(MemorySink::new()))
            .phase(Phase::new(PhaseKind::Documentation).step(SetSlot {
                name: "A",
                slot: ArtifactSlot::DatabaseModel,
                text: "a",
            }))
            .phase(Phase::new(PhaseKind::CodeGeneration).step(Failing));

        let mut ctx = SharedContext::new(RunInputs::default());
        pipeline.run(&mut ctx).await;

        assert!(ctx.artifacts.get(ArtifactSlot::Entities).is_none());
        assert!(matches!(
            pipeline.phases()[1].step_names().as_slice(),
            ["Failing"]
        ));
    }

    #[tokio::test]
    async fn test_disabled_step_leaves_context_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(FeatureToggles::default(), sink.clone()).phase(
            Phase::new(PhaseKind::CodeGeneration).step(Toggled {
                calls: calls.clone(),
            }),
        );

        let mut ctx = SharedContext::new(RunInputs::default());
        ctx.tables_source = "CREATE TABLE [t] (id INT)".to_string();
        let before = ctx.clone();

        let report = pipeline.run(&mut ctx).await;

        assert_eq!(ctx, before);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.outcome("Toggled"), Some(&StepOutcome::Skipped));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_enabled_toggle_runs_step() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(FeatureToggles::all(), Arc::new(MemorySink::new())).phase(
            Phase::new(PhaseKind::CodeGeneration).step(Toggled {
                calls: calls.clone(),
            }),
        );

        let mut ctx = SharedContext::new(RunInputs::default());
        let report = pipeline.run(&mut ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.completed(), 1);
        assert_eq!(ctx.tables_source, "touched");
    }
}
