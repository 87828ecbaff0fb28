//! Shared Run Context
//!
//! One [`SharedContext`] exists per pipeline run. Steps read and mutate it
//! strictly one at a time; fan-out workers never touch it directly but return
//! annotated items that the owning step writes back.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::constants::output;
use crate::types::{AppFile, ClassImplementation, EntityClass, Procedure, ProcedureAnalysis, Table};

// =============================================================================
// Run Inputs
// =============================================================================

/// Paths and filters supplied on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInputs {
    /// DDL file with every `CREATE TABLE` statement
    pub tables_file: Option<PathBuf>,
    /// Entry procedure file name (extension is stripped to get the name)
    pub entry_procedure: String,
    /// Directory holding one stored procedure per file
    pub procedures_dir: Option<PathBuf>,
    /// Root of the legacy application sources
    pub app_dir: Option<PathBuf>,
    /// Application file base names (glob patterns allowed)
    pub app_file_allowlist: Vec<String>,
    /// Scene JSON file for the scene pipeline
    pub scene_file: Option<PathBuf>,
}

impl RunInputs {
    /// Entry procedure name: the file name up to its first `.`
    pub fn entry_name(&self) -> &str {
        procedure_name_from_file(&self.entry_procedure)
    }
}

/// Procedure name for a file name: everything before the first `.`
pub fn procedure_name_from_file(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.split('.').next().unwrap_or(base)
}

// =============================================================================
// Artifact Slots
// =============================================================================

/// Output slots, one per persisted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactSlot {
    DatabaseModel,
    UseCases,
    SequenceDiagram,
    FlowDiagram,
    Entities,
    DbContext,
    Business,
    TimelineReport,
    SummaryTable,
}

impl ArtifactSlot {
    /// File name the slot is published under
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::DatabaseModel => output::DATABASE_MODEL,
            Self::UseCases => output::USE_CASES,
            Self::SequenceDiagram => output::SEQUENCE_DIAGRAM,
            Self::FlowDiagram => output::FLOW_DIAGRAM,
            Self::Entities => output::ENTITIES,
            Self::DbContext => output::DBCONTEXT,
            Self::Business => output::BUSINESS,
            Self::TimelineReport => output::TIMELINE_REPORT,
            Self::SummaryTable => output::SUMMARY_TABLE,
        }
    }
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Slot contents plus the set of slots assigned since the last publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    slots: BTreeMap<ArtifactSlot, String>,
    pending: BTreeSet<ArtifactSlot>,
}

impl Artifacts {
    /// Assign a slot; it is published after the current step returns
    pub fn set(&mut self, slot: ArtifactSlot, content: impl Into<String>) {
        self.slots.insert(slot, content.into());
        self.pending.insert(slot);
    }

    pub fn get(&self, slot: ArtifactSlot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Slot content if assigned and not blank
    pub fn non_empty(&self, slot: ArtifactSlot) -> Option<&str> {
        self.get(slot).filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drain slots awaiting publication, in slot order
    pub fn take_pending(&mut self) -> Vec<(ArtifactSlot, String)> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|slot| self.slots.get(&slot).map(|c| (slot, c.clone())))
            .collect()
    }
}

// =============================================================================
// Shared Context
// =============================================================================

/// State threaded through every phase of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContext {
    pub run_id: Uuid,
    pub inputs: RunInputs,

    // Raw mappings (MapFiles)
    /// DDL file content
    pub tables_source: String,
    /// Procedure file name → content
    pub procedure_files: BTreeMap<String, String>,
    /// Allowlisted application files, sorted by name
    pub app_files: Vec<AppFile>,

    // Parsed mappings
    /// Table name → table
    pub tables: BTreeMap<String, Table>,
    /// Procedure name → procedure
    pub procedures: BTreeMap<String, Procedure>,
    /// Procedures reached from the entry, in walk order
    pub analyses: Vec<ProcedureAnalysis>,

    // Generated code
    pub entities: Vec<EntityClass>,
    pub business_classes: Vec<ClassImplementation>,

    /// Scene JSON (minified when parseable)
    pub scene_json: String,

    pub artifacts: Artifacts,
}

impl SharedContext {
    pub fn new(inputs: RunInputs) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            inputs,
            tables_source: String::new(),
            procedure_files: BTreeMap::new(),
            app_files: Vec::new(),
            tables: BTreeMap::new(),
            procedures: BTreeMap::new(),
            analyses: Vec::new(),
            entities: Vec::new(),
            business_classes: Vec::new(),
            scene_json: String::new(),
            artifacts: Artifacts::default(),
        }
    }

    /// Analysed procedure by name
    pub fn analysis(&self, name: &str) -> Option<&ProcedureAnalysis> {
        self.analyses.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_name_from_file() {
        assert_eq!(procedure_name_from_file("sp_payroll.sql"), "sp_payroll");
        assert_eq!(procedure_name_from_file("dbo.sp_payroll.sql"), "dbo");
        assert_eq!(procedure_name_from_file("procs/sp_x.StoredProcedure.sql"), "sp_x");
        assert_eq!(procedure_name_from_file("sp_plain"), "sp_plain");
    }

    #[test]
    fn test_pending_slots_drain_once() {
        let mut artifacts = Artifacts::default();
        artifacts.set(ArtifactSlot::UseCases, "uc");
        artifacts.set(ArtifactSlot::DatabaseModel, "erDiagram");

        let pending = artifacts.take_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].0, ArtifactSlot::DatabaseModel);
        assert!(artifacts.take_pending().is_empty());
        assert_eq!(artifacts.get(ArtifactSlot::UseCases), Some("uc"));
    }

    #[test]
    fn test_non_empty_ignores_blank() {
        let mut artifacts = Artifacts::default();
        artifacts.set(ArtifactSlot::Business, "  \n");
        assert!(artifacts.non_empty(ArtifactSlot::Business).is_none());
        assert!(artifacts.get(ArtifactSlot::Business).is_some());
    }

    #[test]
    fn test_slot_file_names() {
        assert_eq!(ArtifactSlot::DatabaseModel.file_name(), "database_model.md");
        assert_eq!(ArtifactSlot::UseCases.to_string(), "use_cases_documentation.md");
        assert_eq!(ArtifactSlot::SummaryTable.file_name(), "SUMMARY_TABLE.md");
    }
}
