//! Use-case documentation
//!
//! ## Steps
//!
//! - [`UseCaseFromProcedureStep`]: fan-out over walked procedures
//! - [`UseCaseFromAppFileStep`]: fan-out over allowlisted application files
//! - [`UseCaseConsolidationStep`]: one merge call over both groups
//! - [`UseCaseDiagramsStep`]: sequence and flow diagrams, generated concurrently
//!
//! Per-item write-ups are stored on the items themselves; only the
//! consolidated document and the diagrams become artifacts.

use async_trait::async_trait;
use tracing::{info, warn};

use super::prompts;
use crate::ai::{Prompt, SharedProvider};
use crate::config::FeatureToggles;
use crate::pipeline::{
    ArtifactSlot, Consolidation, SharedContext, Step, consolidate, join_fragments, run_parallel,
};
use crate::types::Result;

pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Fan out `prompts` and return `(index, text)` for every success
async fn fan_out(
    label: &str,
    provider: &SharedProvider,
    concurrency: usize,
    prompts: Vec<(usize, String, Prompt)>,
) -> Vec<(usize, String)> {
    run_parallel(
        label,
        prompts,
        concurrency,
        |(_, name, _)| name.clone(),
        |(index, _, prompt)| {
            let provider = provider.clone();
            async move { provider.complete(&prompt).await.map(|r| (index, r.content)) }
        },
    )
    .await
    .successes
}

// =============================================================================
// From Procedures
// =============================================================================

pub struct UseCaseFromProcedureStep {
    pub provider: SharedProvider,
    pub concurrency: usize,
}

#[async_trait]
impl Step for UseCaseFromProcedureStep {
    fn name(&self) -> &'static str {
        "UseCaseFromProcedure"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.use_case_from_procedure
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let items = ctx
            .analyses
            .iter()
            .enumerate()
            .map(|(i, a)| {
                (
                    i,
                    a.name.clone(),
                    prompts::use_cases_from_procedure(&a.name, &a.content),
                )
            })
            .collect();

        for (index, doc) in fan_out(self.name(), &self.provider, self.concurrency, items).await {
            if let Some(analysis) = ctx.analyses.get_mut(index) {
                analysis.use_cases = Some(doc);
            }
        }
        Ok(())
    }
}

// =============================================================================
// From Application Files
// =============================================================================

pub struct UseCaseFromAppFileStep {
    pub provider: SharedProvider,
    pub concurrency: usize,
}

#[async_trait]
impl Step for UseCaseFromAppFileStep {
    fn name(&self) -> &'static str {
        "UseCaseFromAppFile"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.use_case_from_app_file
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let items = ctx
            .app_files
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.file_name.clone(), prompts::use_cases_from_app_file(f)))
            .collect();

        for (index, doc) in fan_out(self.name(), &self.provider, self.concurrency, items).await {
            if let Some(file) = ctx.app_files.get_mut(index) {
                file.use_cases = Some(doc);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Consolidation
// =============================================================================

pub struct UseCaseConsolidationStep {
    pub provider: SharedProvider,
}

impl UseCaseConsolidationStep {
    /// Procedure group, then application file group; empty groups are omitted
    pub fn collect_documents(ctx: &SharedContext) -> Vec<String> {
        let from_procedures: Vec<&str> = ctx
            .analyses
            .iter()
            .filter_map(|a| a.use_cases.as_deref())
            .collect();
        let from_app_files: Vec<&str> = ctx
            .app_files
            .iter()
            .filter_map(|f| f.use_cases.as_deref())
            .collect();

        [from_procedures, from_app_files]
            .iter()
            .filter_map(|group| join_fragments(group, DOCUMENT_SEPARATOR))
            .collect()
    }
}

#[async_trait]
impl Step for UseCaseConsolidationStep {
    fn name(&self) -> &'static str {
        "UseCaseConsolidation"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.use_case_consolidation
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let groups = Self::collect_documents(ctx);

        let provider = self.provider.clone();
        let merged = consolidate(self.name(), &groups, DOCUMENT_SEPARATOR, |joined| async move {
            provider
                .complete(&prompts::consolidate_use_cases(&joined))
                .await
                .map(|r| r.content)
        })
        .await?;

        match merged {
            Consolidation::Merged(doc) => ctx.artifacts.set(ArtifactSlot::UseCases, doc),
            Consolidation::Skipped => info!("UseCaseConsolidation: No use case documents"),
        }
        Ok(())
    }
}

// =============================================================================
// Diagrams
// =============================================================================

/// Sequence and flow diagrams from the consolidated use case document.
/// Each diagram has its own toggle; the step runs when either is on.
pub struct UseCaseDiagramsStep {
    pub provider: SharedProvider,
    pub concurrency: usize,
    pub sequence: bool,
    pub flow: bool,
}

impl UseCaseDiagramsStep {
    pub fn new(provider: SharedProvider, concurrency: usize, features: &FeatureToggles) -> Self {
        Self {
            provider,
            concurrency,
            sequence: features.use_case_sequence_diagram,
            flow: features.use_case_flow_diagram,
        }
    }
}

#[async_trait]
impl Step for UseCaseDiagramsStep {
    fn name(&self) -> &'static str {
        "UseCaseDiagrams"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.use_case_sequence_diagram || features.use_case_flow_diagram
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let Some(document) = ctx.artifacts.non_empty(ArtifactSlot::UseCases) else {
            warn!("UseCaseDiagrams: No use case document, skipping diagrams");
            return Ok(());
        };

        let mut items = Vec::new();
        if self.sequence {
            items.push((ArtifactSlot::SequenceDiagram, prompts::sequence_diagram(document)));
        } else {
            info!("UseCaseDiagrams: Sequence diagram disabled");
        }
        if self.flow {
            items.push((ArtifactSlot::FlowDiagram, prompts::flow_diagram(document)));
        } else {
            info!("UseCaseDiagrams: Flow diagram disabled");
        }

        let report = run_parallel(
            self.name(),
            items,
            self.concurrency,
            |(slot, _)| slot.to_string(),
            |(slot, prompt)| {
                let provider = self.provider.clone();
                async move { provider.complete(&prompt).await.map(|r| (slot, r.content)) }
            },
        )
        .await;

        for (slot, diagram) in report.successes {
            ctx.artifacts.set(slot, diagram);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::MockProvider;
    use crate::pipeline::RunInputs;
    use crate::types::{AppFile, ProcedureAnalysis};
    use std::sync::Arc;

    fn context() -> SharedContext {
        let mut ctx = SharedContext::new(RunInputs::default());
        ctx.analyses = vec![
            ProcedureAnalysis::new("sp_a", "-- proc a"),
            ProcedureAnalysis::new("sp_b", "-- proc b"),
        ];
        ctx.app_files = vec![AppFile::new("PayrollMngr.java", "// app file")];
        ctx
    }

    #[tokio::test]
    async fn test_use_cases_from_procedures_and_files() {
        let mock = Arc::new(
            MockProvider::new()
                .reply_text("-- proc a", "UC A")
                .fail_on("-- proc b")
                .reply_text("// app file", "UC APP"),
        );

        let mut ctx = context();
        UseCaseFromProcedureStep {
            provider: mock.clone(),
            concurrency: 2,
        }
        .run(&mut ctx)
        .await
        .unwrap();
        UseCaseFromAppFileStep {
            provider: mock.clone(),
            concurrency: 2,
        }
        .run(&mut ctx)
        .await
        .unwrap();

        assert_eq!(ctx.analyses[0].use_cases.as_deref(), Some("UC A"));
        assert!(ctx.analyses[1].use_cases.is_none());
        assert_eq!(ctx.app_files[0].use_cases.as_deref(), Some("UC APP"));
    }

    #[test]
    fn test_document_groups() {
        let mut ctx = context();
        ctx.analyses[0].use_cases = Some("UC A".to_string());
        ctx.analyses[1].use_cases = Some("UC B".to_string());
        ctx.app_files[0].use_cases = Some("UC APP".to_string());

        let groups = UseCaseConsolidationStep::collect_documents(&ctx);
        assert_eq!(groups, vec!["UC A\n\nUC B", "UC APP"]);

        ctx.app_files[0].use_cases = None;
        assert_eq!(
            UseCaseConsolidationStep::collect_documents(&ctx),
            vec!["UC A\n\nUC B"]
        );
    }

    #[tokio::test]
    async fn test_consolidation_merges_both_groups() {
        let mock = Arc::new(MockProvider::new().default_text("MERGED"));
        let mut ctx = context();
        ctx.analyses[0].use_cases = Some("UC A".to_string());
        ctx.app_files[0].use_cases = Some("UC APP".to_string());

        UseCaseConsolidationStep {
            provider: mock.clone(),
        }
        .run(&mut ctx)
        .await
        .unwrap();

        assert_eq!(ctx.artifacts.get(ArtifactSlot::UseCases), Some("MERGED"));
        assert_eq!(mock.calls_containing("UC A\n\nUC APP"), 1);
    }

    #[tokio::test]
    async fn test_consolidation_of_nothing_never_calls_provider() {
        let mock = Arc::new(MockProvider::new());
        let mut ctx = context();

        UseCaseConsolidationStep {
            provider: mock.clone(),
        }
        .run(&mut ctx)
        .await
        .unwrap();

        assert_eq!(mock.calls(), 0);
        assert!(ctx.artifacts.get(ArtifactSlot::UseCases).is_none());
    }

    #[tokio::test]
    async fn test_diagrams_respect_individual_toggles() {
        let mock = Arc::new(
            MockProvider::new()
                .reply_text("Mermaid sequence", "sequenceDiagram")
                .reply_text("Mermaid flowchart", "flowchart TD"),
        );
        let mut ctx = context();
        ctx.artifacts.set(ArtifactSlot::UseCases, "UC DOC");

        let features = FeatureToggles {
            use_case_flow_diagram: false,
            ..Default::default()
        };
        UseCaseDiagramsStep::new(mock.clone(), 2, &features)
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(
            ctx.artifacts.get(ArtifactSlot::SequenceDiagram),
            Some("sequenceDiagram")
        );
        assert!(ctx.artifacts.get(ArtifactSlot::FlowDiagram).is_none());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_diagrams_without_document_are_skipped() {
        let mock = Arc::new(MockProvider::new());
        let mut ctx = context();

        UseCaseDiagramsStep::new(mock.clone(), 2, &FeatureToggles::default())
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 0);
    }
}
