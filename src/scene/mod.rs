//! Scene Report Pipeline
//!
//! Single-phase pipeline for Unity timeline scenes:
//!
//! ```text
//! scene.json ──minify──→ TIMELINE_REPORT.md ──→ SUMMARY_TABLE.md
//! ```

pub mod prompts;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::ai::SharedProvider;
use crate::pipeline::{ArtifactSlot, Phase, PhaseKind, SharedContext, Step};
use crate::preparation::read_text;
use crate::types::{Result, WeaveError};

/// Compact JSON encoding of `content`, or `content` unchanged when it is not JSON
pub fn minify_json(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => value.to_string(),
        Err(e) => {
            debug!("Scene is not JSON ({}), using raw text", e);
            content.to_string()
        }
    }
}

pub fn phase(provider: SharedProvider) -> Phase {
    Phase::new(PhaseKind::SceneReport)
        .step(LoadSceneStep)
        .step(TimelineReportStep {
            provider: provider.clone(),
        })
        .step(SummaryTableStep { provider })
}

fn missing(step: &str, what: &str) -> WeaveError {
    WeaveError::MissingInput {
        step: step.to_string(),
        what: what.to_string(),
    }
}

// =============================================================================
// Steps
// =============================================================================

pub struct LoadSceneStep;

#[async_trait]
impl Step for LoadSceneStep {
    fn name(&self) -> &'static str {
        "LoadScene"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let path = ctx
            .inputs
            .scene_file
            .clone()
            .ok_or_else(|| missing(self.name(), "scene file"))?;

        let raw = read_text(&path)?;
        ctx.scene_json = minify_json(&raw);
        info!(
            "LoadScene: {} ({} → {} bytes)",
            path.display(),
            raw.len(),
            ctx.scene_json.len()
        );
        Ok(())
    }
}

pub struct TimelineReportStep {
    pub provider: SharedProvider,
}

#[async_trait]
impl Step for TimelineReportStep {
    fn name(&self) -> &'static str {
        "TimelineReport"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        if ctx.scene_json.trim().is_empty() {
            return Err(missing(self.name(), "scene content"));
        }

        let response = self
            .provider
            .complete(&prompts::timeline_report(&ctx.scene_json))
            .await?;
        ctx.artifacts
            .set(ArtifactSlot::TimelineReport, response.content);
        Ok(())
    }
}

pub struct SummaryTableStep {
    pub provider: SharedProvider,
}

#[async_trait]
impl Step for SummaryTableStep {
    fn name(&self) -> &'static str {
        "SummaryTable"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let report = ctx
            .artifacts
            .non_empty(ArtifactSlot::TimelineReport)
            .ok_or_else(|| missing(self.name(), "timeline report"))?;

        let response = self
            .provider
            .complete(&prompts::summary_table(report))
            .await?;
        ctx.artifacts.set(ArtifactSlot::SummaryTable, response.content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::MockProvider;
    use crate::config::FeatureToggles;
    use crate::pipeline::{MemorySink, Pipeline, RunInputs, StepOutcome};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_minify_keeps_key_order() {
        let raw = "{\n  \"tracks\": [ {\"name\": \"Audio\"} ],\n  \"name\": \"Addição\"\n}";
        assert_eq!(
            minify_json(raw),
            r#"{"tracks":[{"name":"Audio"}],"name":"Addição"}"#
        );
    }

    #[test]
    fn test_minify_falls_back_to_raw() {
        assert_eq!(minify_json("not { json"), "not { json");
    }

    #[tokio::test]
    async fn test_scene_pipeline_chains_reports() {
        let temp_dir = TempDir::new().unwrap();
        let scene = temp_dir.path().join("scene.json");
        std::fs::write(&scene, "{ \"tracks\": [] }").unwrap();

        let mock = Arc::new(
            MockProvider::new()
                .reply_text("{\"tracks\":[]}", "## Track 1 (Audio Track)")
                .reply_text("## Track 1 (Audio Track)", "| Track | Clip |"),
        );
        let sink = Arc::new(MemorySink::new());
        let pipeline =
            Pipeline::new(FeatureToggles::default(), sink.clone()).phase(phase(mock.clone()));

        let mut ctx = SharedContext::new(RunInputs {
            scene_file: Some(scene),
            ..Default::default()
        });
        let report = pipeline.run(&mut ctx).await;

        assert_eq!(report.failed(), 0);
        assert_eq!(mock.calls(), 2);
        assert_eq!(
            sink.get("TIMELINE_REPORT.md").as_deref(),
            Some("## Track 1 (Audio Track)")
        );
        assert_eq!(sink.get("SUMMARY_TABLE.md").as_deref(), Some("| Track | Clip |"));
    }

    #[tokio::test]
    async fn test_failed_timeline_skips_table_call() {
        let temp_dir = TempDir::new().unwrap();
        let scene = temp_dir.path().join("scene.json");
        std::fs::write(&scene, "{}").unwrap();

        let mock = Arc::new(MockProvider::new().fail_on("Unity animation scene"));
        let pipeline = Pipeline::new(FeatureToggles::default(), Arc::new(MemorySink::new()))
            .phase(phase(mock.clone()));

        let mut ctx = SharedContext::new(RunInputs {
            scene_file: Some(scene),
            ..Default::default()
        });
        let report = pipeline.run(&mut ctx).await;

        assert!(matches!(
            report.outcome("TimelineReport"),
            Some(StepOutcome::Failed(_))
        ));
        assert!(matches!(
            report.outcome("SummaryTable"),
            Some(StepOutcome::Failed(_))
        ));
        assert_eq!(mock.calls(), 1);
    }
}
