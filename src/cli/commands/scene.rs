//! Scene Command
//!
//! Turns a Unity timeline scene into `TIMELINE_REPORT.md` and
//! `SUMMARY_TABLE.md` inside `--output`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;

use super::{ConfigOverrides, load_config};
use crate::ai::{StepProviders, UsageMeter};
use crate::cli::ui::Output;
use crate::pipeline::{FsArtifactSink, Pipeline, RunInputs, SharedContext};
use crate::scene;
use crate::types::Result;

pub fn run(input: PathBuf, output_dir: PathBuf, overrides: ConfigOverrides) -> Result<()> {
    let started = Instant::now();
    let output = Output::new();

    let config = load_config(&overrides)?;
    let providers = StepProviders::from_config(&config, UsageMeter::new())?;

    let pipeline = Pipeline::new(config.features, Arc::new(FsArtifactSink::new(&output_dir)))
        .phase(scene::phase(providers.scene.clone()));
    let mut ctx = SharedContext::new(RunInputs {
        scene_file: Some(input),
        ..Default::default()
    });

    let rt = Runtime::new()?;
    let report = rt.block_on(pipeline.run(&mut ctx));
    output.report(&report);

    println!(
        "Scene file processed in {:.2} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
