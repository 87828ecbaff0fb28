//! Entity and DbContext generation
//!
//! Entities are requested as structured output, one call per table, and each
//! class is also written to its own `entities/{name}.cs` file through the
//! agent tool set. The DbContext is a single agentic call over the entity
//! signatures and the database model diagram.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use super::prompts;
use crate::ai::{SharedProvider, ToolSet, structured};
use crate::config::FeatureToggles;
use crate::pipeline::{ArtifactSlot, SharedContext, Step, run_parallel};
use crate::types::{EntityClass, Result, Table, WeaveError};

// =============================================================================
// Entities
// =============================================================================

pub struct EntitiesStep {
    pub provider: SharedProvider,
    pub concurrency: usize,
    /// Legacy table name → new table name
    pub renames: BTreeMap<String, String>,
    pub tools: ToolSet,
}

impl EntitiesStep {
    /// Tables referenced by the walked procedures, in first-reference order.
    /// Falls back to every parsed table when the walk references none.
    pub fn select_tables(ctx: &SharedContext) -> Vec<Table> {
        let mut seen = HashSet::new();
        let referenced: Vec<Table> = ctx
            .analyses
            .iter()
            .filter_map(|a| ctx.procedures.get(&a.name))
            .flat_map(|p| p.table_names())
            .filter(|name| seen.insert(name.to_string()))
            .filter_map(|name| ctx.tables.get(name).cloned())
            .collect();

        if referenced.is_empty() {
            ctx.tables.values().cloned().collect()
        } else {
            referenced
        }
    }
}

#[async_trait]
impl Step for EntitiesStep {
    fn name(&self) -> &'static str {
        "Entities"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.backend_entities
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        let tables = Self::select_tables(ctx);

        let report = run_parallel(
            self.name(),
            tables,
            self.concurrency,
            |table| table.name.clone(),
            |table| {
                let provider = self.provider.clone();
                let prompt = prompts::entity_from_table(
                    &table.name,
                    &table.content,
                    self.renames.get(&table.name).map(String::as_str),
                );
                async move { structured::<EntityClass>(provider.as_ref(), &prompt).await }
            },
        )
        .await;

        if report.successes.is_empty() {
            info!("Entities: No entity classes generated");
            return Ok(());
        }

        let mut written = 0;
        for entity in &report.successes {
            match self
                .tools
                .call(
                    "write_class_content_to_file",
                    json!({"class_name": entity.name, "class_content": entity.content}),
                )
                .await
            {
                Ok(result) => {
                    written += 1;
                    debug!("Entities: {} -> {}", entity.name, result);
                }
                Err(e) => warn!("Entities: Could not write class file for {}: {}", entity.name, e),
            }
        }
        info!(
            "Entities: {} of {} class files written",
            written,
            report.successes.len()
        );

        let content = report
            .successes
            .iter()
            .map(|e| e.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        ctx.artifacts.set(ArtifactSlot::Entities, content);
        ctx.entities = report.successes;
        Ok(())
    }
}

// =============================================================================
// DbContext
// =============================================================================

pub struct DbContextStep {
    pub provider: SharedProvider,
    pub tools: ToolSet,
    pub recursion_limit: usize,
}

#[async_trait]
impl Step for DbContextStep {
    fn name(&self) -> &'static str {
        "DbContext"
    }

    fn enabled(&self, features: &FeatureToggles) -> bool {
        features.backend_dbcontext
    }

    async fn run(&self, ctx: &mut SharedContext) -> Result<()> {
        if ctx.entities.is_empty() {
            return Err(WeaveError::MissingInput {
                step: self.name().to_string(),
                what: "entity classes".to_string(),
            });
        }

        let signatures = ctx
            .entities
            .iter()
            .map(|e| e.signature.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let database_model = ctx
            .artifacts
            .get(ArtifactSlot::DatabaseModel)
            .unwrap_or_default();

        let prompt = prompts::dbcontext(&signatures, database_model);
        let response = self
            .provider
            .run_agent(&prompt, &self.tools, self.recursion_limit)
            .await?;

        ctx.artifacts.set(ArtifactSlot::DbContext, response.content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::MockProvider;
    use crate::pipeline::{MemorySink, RunInputs};
    use crate::types::{Procedure, ProcedureAnalysis, TableAccess, TableReference};
    use std::sync::Arc;

    fn entity_json(name: &str, table: &str) -> serde_json::Value {
        json!({
            "name": name,
            "content": format!("class {} {{}}", name),
            "signature": format!("public DbSet<{0}> {0}s", name),
            "reference_table": table
        })
    }

    fn context() -> SharedContext {
        let mut ctx = SharedContext::new(RunInputs::default());
        for name in ["w0540", "w0550", "w0999"] {
            ctx.tables.insert(
                name.to_string(),
                Table::new(name, format!("CREATE TABLE [{}] (id INT);", name), 5),
            );
        }
        ctx.procedures.insert(
            "sp_a".to_string(),
            Procedure {
                name: "sp_a".to_string(),
                tables: vec![
                    TableReference::new("w0550", TableAccess::Update),
                    TableReference::new("w0540", TableAccess::Select),
                    TableReference::new("w_missing", TableAccess::Select),
                ],
                ..Default::default()
            },
        );
        ctx.analyses = vec![ProcedureAnalysis::new("sp_a", "-- a")];
        ctx
    }

    #[test]
    fn test_select_referenced_tables() {
        let ctx = context();
        let names: Vec<String> = EntitiesStep::select_tables(&ctx)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["w0550", "w0540"]);
    }

    #[test]
    fn test_select_all_tables_without_references() {
        let mut ctx = context();
        ctx.analyses.clear();
        assert_eq!(EntitiesStep::select_tables(&ctx).len(), 3);
    }

    #[tokio::test]
    async fn test_entities_are_stored_and_written() {
        let mock = Arc::new(
            MockProvider::new()
                .reply_json("[w0540]", entity_json("Employee", "w0540"))
                .fail_on("[w0550]"),
        );
        let sink = Arc::new(MemorySink::new());
        let mut renames = BTreeMap::new();
        renames.insert("w0540".to_string(), "employees".to_string());

        let step = EntitiesStep {
            provider: mock.clone(),
            concurrency: 2,
            renames,
            tools: ToolSet::standard(sink.clone()),
        };

        let mut ctx = context();
        step.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.entities.len(), 1);
        assert_eq!(ctx.entities[0].reference_table, "w0540");
        assert_eq!(
            ctx.artifacts.get(ArtifactSlot::Entities),
            Some("class Employee {}")
        );
        assert_eq!(
            sink.get("entities/Employee.cs").as_deref(),
            Some("class Employee {}")
        );
        assert_eq!(mock.calls_containing("renamed to employees"), 1);
    }

    #[tokio::test]
    async fn test_rejected_class_file_keeps_entity() {
        let mock = Arc::new(
            MockProvider::new()
                .reply_json("[w0540]", entity_json("Employee", "w0540"))
                .reply_json("[w0550]", entity_json("../Contract", "w0550")),
        );
        let sink = Arc::new(MemorySink::new());
        let step = EntitiesStep {
            provider: mock,
            concurrency: 2,
            renames: BTreeMap::new(),
            tools: ToolSet::standard(sink.clone()),
        };

        let mut ctx = context();
        step.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.entities.len(), 2);
        assert_eq!(sink.paths(), vec!["entities/Employee.cs".to_string()]);
    }

    #[tokio::test]
    async fn test_dbcontext_requires_entities() {
        let mock = Arc::new(MockProvider::new());
        let step = DbContextStep {
            provider: mock.clone(),
            tools: ToolSet::new(),
            recursion_limit: 10,
        };

        let mut ctx = context();
        let err = step.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, WeaveError::MissingInput { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_dbcontext_uses_signatures_and_model() {
        let mock = Arc::new(MockProvider::new().default_text("class AppDbContext {}"));
        let step = DbContextStep {
            provider: mock.clone(),
            tools: ToolSet::new(),
            recursion_limit: 10,
        };

        let mut ctx = context();
        ctx.entities = vec![
            serde_json::from_value(entity_json("Employee", "w0540")).unwrap(),
            serde_json::from_value(entity_json("Contract", "w0550")).unwrap(),
        ];
        ctx.artifacts.set(ArtifactSlot::DatabaseModel, "erDiagram MODEL");

        step.run(&mut ctx).await.unwrap();

        assert_eq!(
            ctx.artifacts.get(ArtifactSlot::DbContext),
            Some("class AppDbContext {}")
        );
        assert_eq!(mock.agent_runs(), 1);
        assert_eq!(
            mock.calls_containing("public DbSet<Employee> Employees\npublic DbSet<Contract> Contracts"),
            1
        );
        assert_eq!(mock.calls_containing("erDiagram MODEL"), 1);
    }
}
