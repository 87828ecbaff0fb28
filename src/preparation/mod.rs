//! Preparation Phase
//!
//! Turns raw inputs into the parsed mappings every later phase reads.
//!
//! ## Steps
//!
//! 1. [`MapFilesStep`]: DDL file, procedures directory, allowlisted app files
//! 2. [`MapTablesStep`]: `CREATE TABLE` statements → table mapping
//! 3. [`MapProceduresStep`]: procedure scanning + call tree walk from the entry
//!
//! No step here calls a model.

pub mod procedures;
pub mod sanitizer;
pub mod sources;
pub mod tables;

pub use procedures::{ProcedureScanner, expand_call_tree};
pub use sanitizer::SqlSanitizer;
pub use sources::{AppFileFilter, AppFileScanner, decode, read_procedures_dir, read_text};
pub use tables::TableParser;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::ai::TokenCounter;
use crate::config::AnalysisConfig;
use crate::pipeline::{Phase, PhaseKind, SharedContext, Step};
use crate::types::{Result, WeaveError};

pub fn phase(analysis: &AnalysisConfig) -> Phase {
    Phase::new(PhaseKind::Preparation)
        .step(MapFilesStep)
        .step(MapTablesStep)
        .step(MapProceduresStep {
            sanitize: analysis.sanitize_procedures,
            max_depth: analysis.max_dependency_depth,
            use_tables: analysis.use_tables_in_procedure_analysis,
        })
}

// =============================================================================
// MapFiles
// =============================================================================

/// Reads every raw input. A missing path is logged and leaves its mapping empty.
pub struct MapFilesStep;

#[async_trait]
impl Step for MapFilesStep {
    fn name(&self) -> &'static str {
        "MapFiles"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let inputs = ctx.inputs.clone();

        if let Some(path) = &inputs.tables_file {
            match read_text(path) {
                Ok(content) => ctx.tables_source = content,
                Err(e) => error!("Tables file unavailable: {}", e),
            }
        }

        if let Some(dir) = &inputs.procedures_dir {
            match read_procedures_dir(dir) {
                Ok(files) => ctx.procedure_files = files,
                Err(e) => error!("Procedures unavailable: {}", e),
            }
        }

        if let Some(dir) = &inputs.app_dir {
            let scanned = AppFileScanner::new(dir, &inputs.app_file_allowlist)
                .and_then(|scanner| scanner.scan());
            match scanned {
                Ok(files) => ctx.app_files = files,
                Err(e) => error!("Application files unavailable: {}", e),
            }
        }

        info!(
            "MapFiles: {} bytes of DDL, {} procedure files, {} application files",
            ctx.tables_source.len(),
            ctx.procedure_files.len(),
            ctx.app_files.len()
        );
        Ok(())
    }
}

// =============================================================================
// MapTablesContent
// =============================================================================

pub struct MapTablesStep;

#[async_trait]
impl Step for MapTablesStep {
    fn name(&self) -> &'static str {
        "MapTablesContent"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        if ctx.tables_source.trim().is_empty() {
            warn!("MapTablesContent: No table DDL loaded");
            return Ok(());
        }

        let parser = TableParser::new(TokenCounter::default())?;
        ctx.tables = parser.parse(&ctx.tables_source);

        info!("MapTablesContent: {} tables", ctx.tables.len());
        Ok(())
    }
}

// =============================================================================
// MapProceduresContent
// =============================================================================

pub struct MapProceduresStep {
    pub sanitize: bool,
    pub max_depth: i32,
    pub use_tables: bool,
}

#[async_trait]
impl Step for MapProceduresStep {
    fn name(&self) -> &'static str {
        "MapProceduresContent"
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let scanner = ProcedureScanner::new(self.sanitize, TokenCounter::default())?;
        ctx.procedures = scanner.scan_all(&ctx.procedure_files);

        let entry = ctx.inputs.entry_name().to_string();
        if entry.is_empty() {
            return Err(WeaveError::missing_input(self.name(), "entry procedure"));
        }

        let (analyses, missing) = expand_call_tree(
            &entry,
            &ctx.procedures,
            &ctx.tables,
            self.max_depth,
            self.use_tables,
        );

        if !missing.is_empty() {
            warn!(
                "MapProceduresContent: {} referenced procedures not found: {}",
                missing.len(),
                missing.join(", ")
            );
        }

        info!(
            "MapProceduresContent: {} procedures scanned, {} reached from {} (max depth {})",
            ctx.procedures.len(),
            analyses.len(),
            entry,
            self.max_depth
        );
        ctx.analyses = analyses;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureToggles;
    use crate::pipeline::{MemorySink, Pipeline, RunInputs};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, RunInputs) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        std::fs::write(
            root.join("tables.sql"),
            "CREATE TABLE [t_emp] (id INT);\nCREATE TABLE [t_pay] (id INT);",
        )
        .unwrap();

        let procs = root.join("procs");
        std::fs::create_dir(&procs).unwrap();
        std::fs::write(
            procs.join("sp_entry.sql"),
            "SELECT id FROM t_emp\nEXEC dbo.sp_pay",
        )
        .unwrap();
        std::fs::write(procs.join("sp_pay.sql"), "UPDATE t_pay SET id = 1").unwrap();

        let app = root.join("app/src");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("PayrollMngr.java"), "class PayrollMngr {}").unwrap();

        let inputs = RunInputs {
            tables_file: Some(root.join("tables.sql")),
            entry_procedure: "sp_entry.sql".to_string(),
            procedures_dir: Some(procs),
            app_dir: Some(root.join("app")),
            app_file_allowlist: vec!["PayrollMngr.java".to_string()],
            scene_file: None,
        };
        (temp_dir, inputs)
    }

    fn analysis(use_tables: bool) -> AnalysisConfig {
        AnalysisConfig {
            use_tables_in_procedure_analysis: use_tables,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_preparation_phase_end_to_end() {
        let (_temp_dir, inputs) = fixture();
        let pipeline = Pipeline::new(FeatureToggles::default(), Arc::new(MemorySink::new()))
            .phase(phase(&analysis(true)));

        let mut ctx = SharedContext::new(inputs);
        let report = pipeline.run(&mut ctx).await;

        assert_eq!(report.failed(), 0);
        assert_eq!(ctx.tables.len(), 2);
        assert_eq!(ctx.procedures.len(), 2);
        assert_eq!(ctx.app_files.len(), 1);

        let names: Vec<_> = ctx.analyses.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["sp_entry", "sp_pay"]);
        assert!(ctx.analyses[1].content.contains("-- Content of table t_pay --"));
    }

    #[tokio::test]
    async fn test_missing_inputs_are_logged_not_fatal() {
        let inputs = RunInputs {
            tables_file: Some("/nonexistent/tables.sql".into()),
            procedures_dir: Some("/nonexistent/procs".into()),
            entry_procedure: "sp_entry.sql".to_string(),
            ..Default::default()
        };
        let mut ctx = SharedContext::new(inputs);

        MapFilesStep.run(&mut ctx).await.unwrap();
        MapTablesStep.run(&mut ctx).await.unwrap();

        assert!(ctx.tables_source.is_empty());
        assert!(ctx.procedure_files.is_empty());
        assert!(ctx.tables.is_empty());
    }

    #[tokio::test]
    async fn test_missing_entry_fails_step() {
        let mut ctx = SharedContext::new(RunInputs::default());
        let step = MapProceduresStep {
            sanitize: true,
            max_depth: -1,
            use_tables: false,
        };

        assert!(matches!(
            step.run(&mut ctx).await,
            Err(WeaveError::MissingInput { .. })
        ));
    }
}
