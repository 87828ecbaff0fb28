//! Database model documentation
//!
//! One Mermaid ER fragment per walked procedure (fan-out), then a single
//! consolidation call that merges the fragments into `database_model.md`.

use async_trait::async_trait;
use tracing::info;

use super::prompts;
use crate::ai::SharedProvider;
use crate::config::FeatureToggles;
use crate::pipeline::{ArtifactSlot, Consolidation, SharedContext, Step, consolidate, run_parallel};
use crate::types::Result;

/// Separator between `"{name}\n{fragment}"` blocks handed to consolidation
pub const FRAGMENT_SEPARATOR: &str = "\n\n\n";

pub struct DatabaseModelStep {
    pub provider: SharedProvider,
    pub concurrency: usize,
}

#[async_trait]
impl Step for DatabaseModelStep {
    fn name(&self) -> &'static str {
        "DatabaseModel"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.database_model
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let items: Vec<(usize, String, String)> = ctx
            .analyses
            .iter()
            .enumerate()
            .map(|(i, a)| (i, a.name.clone(), a.content.clone()))
            .collect();

        let report = run_parallel(
            "DatabaseModel",
            items,
            self.concurrency,
            |(_, name, _)| name.clone(),
            |(index, name, content)| {
                let provider = self.provider.clone();
                async move {
                    provider
                        .complete(&prompts::er_fragment(&name, &content))
                        .await
                        .map(|r| (index, r.content))
                }
            },
        )
        .await;

        for (index, mermaid) in report.successes {
            if let Some(analysis) = ctx.analyses.get_mut(index) {
                analysis.mermaid = Some(mermaid);
            }
        }

        let fragments: Vec<String> = ctx
            .analyses
            .iter()
            .filter_map(|a| {
                a.mermaid
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .map(|m| format!("{}\n{}", a.name, m))
            })
            .collect();

        let provider = self.provider.clone();
        let merged = consolidate(
            "DatabaseModel",
            &fragments,
            FRAGMENT_SEPARATOR,
            |joined| async move {
                provider
                    .complete(&prompts::consolidate_er(&joined))
                    .await
                    .map(|r| r.content)
            },
        )
        .await?;

        match merged {
            Consolidation::Merged(diagram) => {
                ctx.artifacts.set(ArtifactSlot::DatabaseModel, diagram)
            }
            Consolidation::Skipped => {
                info!("DatabaseModel: No diagram fragments, nothing published")
            }
        }
        Ok(())
    }
}
