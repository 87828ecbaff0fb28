//! Stored procedure analysis
//!
//! Static scanning of procedure bodies for called procedures and referenced
//! tables, plus expansion of the walked call tree into the analysis list
//! the documentation phase works on.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::sanitizer::{SqlSanitizer, compile};
use crate::ai::TokenCounter;
use crate::constants::llm::CONTEXT_WARN_TOKENS;
use crate::pipeline::{Dependent, Walk, collect_with_dependencies, procedure_name_from_file};
use crate::types::{Procedure, ProcedureAnalysis, Result, Table, TableAccess, TableReference};

impl Dependent for Procedure {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.calls.clone()
    }
}

// =============================================================================
// Scanner
// =============================================================================

pub struct ProcedureScanner {
    call: Regex,
    table_patterns: Vec<(TableAccess, Regex)>,
    sanitizer: Option<SqlSanitizer>,
    counter: TokenCounter,
}

impl ProcedureScanner {
    /// `sanitize` strips drop guards, block comments and blank lines first
    pub fn new(sanitize: bool, counter: TokenCounter) -> Result<Self> {
        let table_patterns = [
            (TableAccess::Select, r"(?i)SELECT\s+.+?\s+FROM\s+([\w\.]+)"),
            (TableAccess::Insert, r"(?i)INSERT\s+INTO\s+([\w\.]+)"),
            (TableAccess::Update, r"(?i)UPDATE\s+([\w\.]+)"),
            (TableAccess::Delete, r"(?i)DELETE\s+FROM\s+([\w\.]+)"),
            (TableAccess::Join, r"(?i)(?:INNER|LEFT|RIGHT)\s+JOIN\s+([\w\.]+)"),
        ]
        .into_iter()
        .map(|(access, pattern)| compile(pattern).map(|re| (access, re)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            call: compile(r"(?i)\b(EXEC|EXECUTE)\b\s+(?:@\w+\s*=\s*)?([\w\.]+)")?,
            table_patterns,
            sanitizer: sanitize.then(SqlSanitizer::new).transpose()?,
            counter,
        })
    }

    /// Build the procedure model for one file
    pub fn scan(&self, file_name: &str, raw: &str) -> Procedure {
        let content = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(raw),
            None => raw.to_string(),
        };

        let name = procedure_name_from_file(file_name).to_string();
        let tokens = self.counter.count(&content);
        if tokens > CONTEXT_WARN_TOKENS {
            warn!("Procedure {} is large (~{} tokens)", name, tokens);
        }

        Procedure {
            calls: self.calls(&content),
            tables: self.tables(&content),
            code_lines: content.lines().count(),
            tokens,
            name,
            content,
        }
    }

    /// Called procedure names, schema stripped, first-seen order.
    /// `EXEC name(` forms (function-style calls) are ignored.
    pub fn calls(&self, content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut calls = Vec::new();

        for caps in self.call.captures_iter(content) {
            let Some(target) = caps.get(2) else {
                continue;
            };

            if content[target.end()..].trim_start().starts_with('(') {
                continue;
            }

            let name = target
                .as_str()
                .rsplit('.')
                .next()
                .unwrap_or(target.as_str());

            if !name.is_empty() && seen.insert(name.to_string()) {
                calls.push(name.to_string());
            }
        }

        calls
    }

    /// Table references unique on (name, access), sorted by name
    pub fn tables(&self, content: &str) -> Vec<TableReference> {
        let mut seen = HashSet::new();
        let mut tables: Vec<TableReference> = self
            .table_patterns
            .iter()
            .flat_map(|(access, re)| {
                re.captures_iter(content)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| TableReference::new(m.as_str(), *access))
            })
            .filter(|t| seen.insert(t.clone()))
            .collect();

        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        tables
    }

    /// Scan every procedure file, keyed by procedure name
    pub fn scan_all(&self, files: &BTreeMap<String, String>) -> BTreeMap<String, Procedure> {
        files
            .iter()
            .filter(|(_, content)| !content.trim().is_empty())
            .map(|(file_name, content)| {
                let procedure = self.scan(file_name, content);
                debug!(
                    "Procedure {}: {} calls, {} table refs, {} lines",
                    procedure.name,
                    procedure.calls.len(),
                    procedure.tables.len(),
                    procedure.code_lines
                );
                (procedure.name.clone(), procedure)
            })
            .collect()
    }
}

// =============================================================================
// Call Tree Expansion
// =============================================================================

/// Walk the call tree from `entry` and expand each visited procedure into
/// its analysis content (optionally with the DDL of every referenced table).
pub fn expand_call_tree(
    entry: &str,
    procedures: &BTreeMap<String, Procedure>,
    tables: &BTreeMap<String, Table>,
    max_depth: i32,
    use_tables: bool,
) -> (Vec<ProcedureAnalysis>, Vec<String>) {
    let Walk { items, missing } =
        collect_with_dependencies(entry, |name| procedures.get(name).cloned(), max_depth);

    let analyses = items
        .iter()
        .map(|procedure| {
            let mut content = format!(
                "\n-- Content of procedure {} --\n{}",
                procedure.name, procedure.content
            );

            if use_tables {
                for table in procedure.table_names() {
                    content.push_str(&table_section(table, tables));
                }
            }

            ProcedureAnalysis::new(&procedure.name, content)
        })
        .collect();

    (analyses, missing)
}

fn table_section(name: &str, tables: &BTreeMap<String, Table>) -> String {
    match tables.get(name) {
        Some(table) => format!("\n-- Content of table {} --\n{}\n", name, table.content),
        None => {
            warn!("Table not found: {}", name);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ProcedureScanner {
        ProcedureScanner::new(true, TokenCounter::default()).unwrap()
    }

    #[test]
    fn test_calls_strip_schema_and_dedup() {
        let content = "EXEC dbo.sp_calc @id\n\
                       execute @rc = sp_log 'x'\n\
                       EXEC sp_calc\n\
                       EXEC sp_func(1)\n\
                       EXEC (@dynamic_sql)\n\
                       EXECUTE sp_notify";

        assert_eq!(
            scanner().calls(content),
            vec!["sp_calc", "sp_log", "sp_notify"]
        );
    }

    #[test]
    fn test_table_references() {
        let content = "SELECT a, b FROM w0540_empleados e\n\
                       INNER JOIN w0550_contratos c ON c.id = e.id\n\
                       INSERT INTO dbo.w0600_log (x) VALUES (1)\n\
                       update w0540_empleados SET a = 1\n\
                       select x from w0540_empleados\n\
                       DELETE FROM w0700_tmp";

        let tables = scanner().tables(content);
        let refs: Vec<(&str, TableAccess)> = tables
            .iter()
            .map(|t| (t.table_name.as_str(), t.access))
            .collect();

        assert_eq!(
            refs,
            vec![
                ("dbo.w0600_log", TableAccess::Insert),
                ("w0540_empleados", TableAccess::Select),
                ("w0540_empleados", TableAccess::Update),
                ("w0550_contratos", TableAccess::Join),
                ("w0700_tmp", TableAccess::Delete),
            ]
        );
    }

    #[test]
    fn test_scan_names_from_file_and_sanitizes() {
        let procedure = scanner().scan(
            "sp_payroll.StoredProcedure.sql",
            "/* header */\n\nCREATE PROCEDURE sp_payroll AS\n  EXEC sp_calc\n",
        );

        assert_eq!(procedure.name, "sp_payroll");
        assert_eq!(procedure.content, "CREATE PROCEDURE sp_payroll AS\nEXEC sp_calc");
        assert_eq!(procedure.calls, vec!["sp_calc"]);
        assert_eq!(procedure.code_lines, 2);
    }

    #[test]
    fn test_unsanitized_content_is_kept_verbatim() {
        let scanner = ProcedureScanner::new(false, TokenCounter::default()).unwrap();
        let procedure = scanner.scan("sp_a.sql", "/* c */\nSELECT 1");
        assert_eq!(procedure.content, "/* c */\nSELECT 1");
    }

    fn procedures() -> BTreeMap<String, Procedure> {
        let s = scanner();
        let files: BTreeMap<String, String> = [
            ("sp_entry.sql", "SELECT a FROM t_main\nEXEC sp_child\nEXEC sp_missing"),
            ("sp_child.sql", "UPDATE t_child SET a = 1\nEXEC sp_entry"),
            ("sp_unrelated.sql", "SELECT 1 FROM t_other"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        s.scan_all(&files)
    }

    #[test]
    fn test_expand_call_tree_without_tables() {
        let (analyses, missing) =
            expand_call_tree("sp_entry", &procedures(), &BTreeMap::new(), -1, false);

        let names: Vec<_> = analyses.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["sp_entry", "sp_child"]);
        assert_eq!(missing, vec!["sp_missing"]);
        assert!(analyses[0]
            .content
            .starts_with("\n-- Content of procedure sp_entry --\nSELECT a FROM t_main"));
    }

    #[test]
    fn test_expand_call_tree_inlines_known_tables() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "t_main".to_string(),
            Table::new("t_main", "CREATE TABLE [t_main] (a INT);", 5),
        );

        let (analyses, _) = expand_call_tree("sp_entry", &procedures(), &tables, 1, true);

        assert_eq!(analyses.len(), 1);
        assert!(analyses[0]
            .content
            .ends_with("\n-- Content of table t_main --\nCREATE TABLE [t_main] (a INT);\n"));
    }

    #[test]
    fn test_missing_table_contributes_nothing() {
        let (analyses, _) =
            expand_call_tree("sp_child", &procedures(), &BTreeMap::new(), 1, true);
        assert!(!analyses[0].content.contains("-- Content of table"));
    }
}
