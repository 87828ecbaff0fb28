//! Analyze Command
//!
//! Runs the preparation, documentation and code generation phases over a
//! legacy SQL Server system and writes every artifact into a timestamped
//! directory below `--output`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::info;

use super::{ConfigOverrides, load_config};
use crate::ai::{StepProviders, UsageMeter};
use crate::cli::ui::Output;
use crate::config::Config;
use crate::pipeline::{
    ArtifactSink, FsArtifactSink, Pipeline, RunInputs, SharedContext, SharedSink,
};
use crate::types::Result;
use crate::{codegen, documentation, preparation};

/// Inputs of one analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub tables: Option<PathBuf>,
    pub entry: String,
    pub procedures: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
    pub app_files: Vec<String>,
    pub output: PathBuf,
    pub overrides: ConfigOverrides,
}

impl AnalyzeOptions {
    fn inputs(&self) -> RunInputs {
        RunInputs {
            tables_file: self.tables.clone(),
            entry_procedure: self.entry.clone(),
            procedures_dir: self.procedures.clone(),
            app_dir: self.app_dir.clone(),
            app_file_allowlist: self.app_files.clone(),
            scene_file: None,
        }
    }
}

/// Preparation → Documentation → CodeGeneration
pub fn build_pipeline(config: &Config, providers: &StepProviders, sink: SharedSink) -> Pipeline {
    Pipeline::new(config.features, sink.clone())
        .phase(preparation::phase(&config.analysis))
        .phase(documentation::phase(
            providers,
            &config.concurrency,
            &config.features,
        ))
        .phase(codegen::phase(
            providers,
            &config.concurrency,
            &config.analysis,
            sink,
        ))
}

pub fn run(options: AnalyzeOptions) -> Result<()> {
    let started = Instant::now();
    let output = Output::new();

    let config = load_config(&options.overrides)?;
    let sink = Arc::new(FsArtifactSink::timestamped(
        &options.output,
        &config.output.timestamp_format,
    )?);

    let meter = UsageMeter::new();
    let providers = StepProviders::from_config(&config, meter.clone())?;
    info!(
        "Using LLM provider: {} ({})",
        providers.default.name(),
        providers.default.model()
    );

    let pipeline = build_pipeline(&config, &providers, sink.clone());
    let mut ctx = SharedContext::new(options.inputs());

    output.header(&format!("Analyzing {}", ctx.inputs.entry_name()));
    let rt = Runtime::new()?;
    let report = rt.block_on(pipeline.run(&mut ctx));

    output.report(&report);
    output.usage(&meter.snapshot());

    println!(
        "Analysis completed in {:.2}s. Output written to {}",
        started.elapsed().as_secs_f64(),
        sink.location()
    );
    Ok(())
}
