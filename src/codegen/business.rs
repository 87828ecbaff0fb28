//! Business layer generation
//!
//! The entry procedure is generated first. Every generated class may leave
//! placeholders for the procedures it calls (`next_implementation`); each
//! placeholder is generated with the calling class as context and expanded
//! depth first, so a class is always followed by the classes it depends on.
//! Expansion stops below `max_depth` levels (-1 = unlimited).

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::prompts;
use crate::ai::{SharedProvider, structured};
use crate::config::FeatureToggles;
use crate::pipeline::{ArtifactSlot, SharedContext, Step};
use crate::types::{ClassImplementation, CodeResult, ProcedureAnalysis, Result, WeaveError};

/// Separator between generated classes in the business artifact
pub const CLASS_SEPARATOR: &str = "\n\n";

pub struct BusinessStep {
    pub provider: SharedProvider,
    pub max_depth: i32,
}

/// A generated class whose `next_implementation` entries are being expanded
struct Frame {
    parent: ClassImplementation,
    depth: i32,
    next: usize,
}

/// (procedure name, class name) pairs already generated or requested
#[derive(Default)]
struct Generated(HashSet<(String, String)>);

impl Generated {
    fn record(&mut self, procedure: &str, classes: &[ClassImplementation]) {
        for class in classes {
            self.0.insert((procedure.to_string(), class.name.clone()));
        }
    }

    /// False when this class of this procedure was already generated
    fn claim(&mut self, procedure: &str, class: &str) -> bool {
        self.0.insert((procedure.to_string(), class.to_string()))
    }
}

impl BusinessStep {
    async fn generate(
        &self,
        analysis: &ProcedureAnalysis,
        dependency: Option<(&str, &str)>,
    ) -> Result<CodeResult> {
        let prompt = prompts::business_from_procedure(
            &analysis.name,
            &analysis.content,
            analysis.mermaid.as_deref(),
            dependency.map(|(class, _)| class),
            dependency.map(|(_, parent)| parent),
        );
        structured::<CodeResult>(self.provider.as_ref(), &prompt).await
    }

    fn within_depth(&self, depth: i32) -> bool {
        self.max_depth == -1 || depth <= self.max_depth
    }

    fn push_frames(stack: &mut Vec<Frame>, classes: Vec<ClassImplementation>, depth: i32) {
        // Reversed so the first class is expanded first
        stack.extend(classes.into_iter().rev().map(|parent| Frame {
            parent,
            depth,
            next: 0,
        }));
    }
}

#[async_trait]
impl Step for BusinessStep {
    fn name(&self) -> &'static str {
        "Business"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.backend_business
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let entry_name = ctx.inputs.entry_name().to_string();
        let entry = ctx
            .analysis(&entry_name)
            .ok_or_else(|| WeaveError::MissingInput {
                step: self.name().to_string(),
                what: format!("entry procedure analysis '{}'", entry_name),
            })?;

        info!("Business: Generating code for entry procedure {}", entry_name);
        let root = self.generate(entry, None).await?;

        let mut generated = Generated::default();
        generated.record(&entry_name, &root.class_implementations);
        let mut classes: Vec<ClassImplementation> = root.class_implementations.clone();
        let mut stack: Vec<Frame> = Vec::new();
        Self::push_frames(&mut stack, root.class_implementations, 1);

        while let Some(frame) = stack.last_mut() {
            if frame.next == 0 && !self.within_depth(frame.depth) {
                if !frame.parent.next_implementation.is_empty() {
                    info!(
                        "Business: Dependency depth {} exceeded, {} left as placeholders",
                        frame.depth, frame.parent.name
                    );
                }
                stack.pop();
                continue;
            }

            let Some(dependency) = frame.parent.next_implementation.get(frame.next).cloned()
            else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let depth = frame.depth;
            let parent_content = frame.parent.content.clone();

            if !generated.claim(
                &dependency.procedure_name,
                &dependency.class_to_be_implemented,
            ) {
                debug!(
                    "Business: {} from {} already generated",
                    dependency.class_to_be_implemented, dependency.procedure_name
                );
                continue;
            }

            let Some(analysis) = ctx.analysis(&dependency.procedure_name) else {
                warn!(
                    "Business: Procedure {} not found in analysis results",
                    dependency.procedure_name
                );
                continue;
            };

            info!(
                "Business: Generating code for dependency {} at depth {}",
                dependency.procedure_name, depth
            );
            let request = (
                dependency.class_to_be_implemented.as_str(),
                parent_content.as_str(),
            );
            match self.generate(analysis, Some(request)).await {
                Ok(result) => {
                    generated.record(&dependency.procedure_name, &result.class_implementations);
                    classes.extend(result.class_implementations.iter().cloned());
                    Self::push_frames(&mut stack, result.class_implementations, depth + 1);
                }
                Err(e) => warn!(
                    "Business: Dependency {} failed: {}",
                    dependency.procedure_name, e
                ),
            }
        }

        info!("Business: Total classes generated: {}", classes.len());
        let content = classes
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(CLASS_SEPARATOR);
        ctx.artifacts.set(ArtifactSlot::Business, content);
        ctx.business_classes = classes;
        Ok(())
    }
}
