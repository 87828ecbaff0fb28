//! Domain Items
//!
//! Legacy artifacts processed by the pipeline: stored procedures, database
//! tables and application files. Each item is built during preparation from
//! raw file content and later enriched in place with LLM-derived annotations.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// =============================================================================
// Table References
// =============================================================================

/// How a procedure touches a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableAccess {
    Select,
    Insert,
    Update,
    Delete,
    Join,
}

impl fmt::Display for TableAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Join => write!(f, "JOIN"),
        }
    }
}

/// A table referenced by a stored procedure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableReference {
    pub table_name: String,
    pub access: TableAccess,
}

impl TableReference {
    pub fn new(table_name: impl Into<String>, access: TableAccess) -> Self {
        Self {
            table_name: table_name.into(),
            access,
        }
    }
}

// =============================================================================
// Procedures
// =============================================================================

/// A stored procedure parsed from one file of the procedures directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub content: String,
    /// Called procedures in first-seen order, schema prefix stripped
    pub calls: Vec<String>,
    /// Referenced tables, unique on (name, access) and sorted by name
    pub tables: Vec<TableReference>,
    pub code_lines: usize,
    pub tokens: usize,
}

impl Procedure {
    /// Distinct referenced table names, in reference order
    pub fn table_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tables
            .iter()
            .map(|t| t.table_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Outgoing call edges of this procedure
    pub fn call_edges(&self) -> impl Iterator<Item = CallGraphEdge> + '_ {
        self.calls.iter().map(|callee| CallGraphEdge {
            caller: self.name.clone(),
            callee: callee.clone(),
        })
    }
}

/// (caller, callee) pair derived from static scanning of procedure content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallGraphEdge {
    pub caller: String,
    pub callee: String,
}

/// A procedure reached by the dependency walk, with its expanded content and
/// the annotations produced by the documentation phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureAnalysis {
    pub name: String,
    /// Procedure content with the optional inlined table DDL
    pub content: String,
    /// Mermaid ER fragment for this procedure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid: Option<String>,
    /// Use-case write-up for this procedure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cases: Option<String>,
}

impl ProcedureAnalysis {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mermaid: None,
            use_cases: None,
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

/// A `CREATE TABLE` statement extracted from the DDL file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub content: String,
    pub code_lines: usize,
    pub tokens: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, content: impl Into<String>, tokens: usize) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            code_lines: content.lines().count(),
            content,
            tokens,
        }
    }
}

// =============================================================================
// Application Files
// =============================================================================

/// A legacy application source file selected by the allowlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppFile {
    pub file_name: String,
    pub content: String,
    /// Methods the use-case extraction should concentrate on (empty = whole file)
    pub method_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cases: Option<String>,
}

impl AppFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            method_names: Vec::new(),
            use_cases: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_are_distinct() {
        let procedure = Procedure {
            name: "sp_payroll".to_string(),
            tables: vec![
                TableReference::new("w0540_empleados", TableAccess::Join),
                TableReference::new("w0540_empleados", TableAccess::Select),
                TableReference::new("w0550_contratos", TableAccess::Update),
            ],
            ..Default::default()
        };

        assert_eq!(
            procedure.table_names(),
            vec!["w0540_empleados", "w0550_contratos"]
        );
    }

    #[test]
    fn test_call_edges() {
        let procedure = Procedure {
            name: "a".to_string(),
            calls: vec!["b".to_string(), "c".to_string()],
            ..Default::default()
        };

        let edges: Vec<_> = procedure.call_edges().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].caller, "a");
        assert_eq!(edges[1].callee, "c");
    }

    #[test]
    fn test_table_line_count() {
        let table = Table::new("t1", "CREATE TABLE [t1] (\n  id INT\n);", 7);
        assert_eq!(table.code_lines, 3);
        assert_eq!(table.tokens, 7);
    }

    #[test]
    fn test_table_access_serializes_uppercase() {
        let json = serde_json::to_string(&TableAccess::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }
}
