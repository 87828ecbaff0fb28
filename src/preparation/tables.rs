//! Table DDL parsing
//!
//! Splits a schema script into its `CREATE TABLE` statements and names each
//! one after the table it creates.

use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use super::sanitizer::compile;
use crate::ai::TokenCounter;
use crate::types::{Result, Table};

pub struct TableParser {
    boundary: Regex,
    bracketed_name: Regex,
    plain_name: Regex,
    counter: TokenCounter,
}

impl TableParser {
    pub fn new(counter: TokenCounter) -> Result<Self> {
        Ok(Self {
            boundary: compile(r"(?i);\s*(CREATE\s+TABLE)")?,
            bracketed_name: compile(r"(?i)CREATE\s+TABLE\s+\[(.*?)\]")?,
            plain_name: compile(r"(?i)CREATE\s+TABLE\s+([\w\.]+)")?,
            counter,
        })
    }

    /// Statements of `ddl`, split before every `CREATE TABLE` that follows a `;`
    pub fn split_statements<'a>(&self, ddl: &'a str) -> Vec<&'a str> {
        let mut statements = Vec::new();
        let mut cursor = 0;

        for caps in self.boundary.captures_iter(ddl) {
            let (Some(whole), Some(create)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            statements.push(&ddl[cursor..whole.start()]);
            cursor = create.start();
        }
        statements.push(&ddl[cursor..]);

        statements
    }

    pub fn table_name(&self, statement: &str) -> Option<String> {
        self.bracketed_name
            .captures(statement)
            .or_else(|| self.plain_name.captures(statement))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    /// Every named `CREATE TABLE` statement, keyed by table name
    pub fn parse(&self, ddl: &str) -> BTreeMap<String, Table> {
        let mut tables = BTreeMap::new();

        for statement in self.split_statements(ddl) {
            let statement = statement.trim().trim_end_matches(';').trim_end();
            if !starts_with_create_table(statement) {
                continue;
            }

            let Some(name) = self.table_name(statement) else {
                debug!("Skipping unnamed CREATE TABLE statement");
                continue;
            };

            let content = format!("{};", statement);
            let tokens = self.counter.count(&content);
            tables.insert(name.clone(), Table::new(name, content, tokens));
        }

        tables
    }
}

fn starts_with_create_table(statement: &str) -> bool {
    let mut words = statement.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(a), Some(b)) if a.eq_ignore_ascii_case("CREATE") && b.to_ascii_uppercase().starts_with("TABLE")
    )
}
