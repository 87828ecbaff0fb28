//! Documentation prompt templates

use crate::ai::{Prompt, PromptBuilder};
use crate::types::AppFile;

const ER_RELATIONSHIP_SYNTAX: &str = "\
Use this syntax for relationship cardinality:
|o  o|  Zero or one
||  ||  Exactly one
}o  o{  Zero or more (no upper limit)
}|  |{  One or more (no upper limit)";

// =============================================================================
// Database Model
// =============================================================================

/// Mermaid ER fragment for one walked procedure
pub fn er_fragment(procedure_name: &str, content: &str) -> Prompt {
    let system = PromptBuilder::new()
        .role(
            "Database Architect",
            "reverse-engineering database schemas from SQL code",
        )
        .objectives(&[
            "Identify every table the SQL code reads or writes",
            "List the columns that are used, with data types when they can be inferred",
            "Infer relationships from joins, foreign keys and matching key columns",
        ])
        .custom(ER_RELATIONSHIP_SYNTAX)
        .build();

    let user = PromptBuilder::new()
        .section(
            &format!("Stored procedure {}", procedure_name),
            "Considering the SQL code below:",
        )
        .code("sql", content)
        .custom(
            "Generate a Mermaid erDiagram with the tables, columns and relationships \
             found in this code. Respond only with the Mermaid code block.",
        )
        .build();

    Prompt::new(system).user(user)
}

/// Merge per-procedure ER fragments into one diagram
pub fn consolidate_er(fragments: &str) -> Prompt {
    let system = PromptBuilder::new()
        .role(
            "Database Architect",
            "consolidating Mermaid ER diagrams extracted from stored procedures",
        )
        .objectives(&[
            "Merge duplicate tables into one entity, keeping every column",
            "When a column appears with different types, keep the most specific type",
            "Keep every distinct relationship exactly once",
        ])
        .custom(ER_RELATIONSHIP_SYNTAX)
        .build();

    let user = PromptBuilder::new()
        .section("Diagrams per procedure", fragments)
        .custom("Respond with a single consolidated Mermaid erDiagram code block.")
        .build();

    Prompt::new(system).user(user)
}

// =============================================================================
// Use Cases
// =============================================================================

const USE_CASE_TEMPLATE: &str = "\
## Use case: <name>
- **Actors**: ...
- **Preconditions**: ...
- **Main flow**: numbered steps
- **Alternative flows**: ...
- **Business rules**: validations, calculations and constraints
- **Data touched**: tables and columns
- **Source**: <procedure or file name>";

fn use_case_system(source_kind: &str) -> String {
    PromptBuilder::new()
        .role(
            "Business Analyst",
            &format!("documenting legacy business processes from {}", source_kind),
        )
        .objectives(&[
            "Describe what the business process does, not how the code is written",
            "Capture every business rule, validation and calculation",
            "Attribute each use case to the artifact it was derived from",
        ])
        .section("Document template", USE_CASE_TEMPLATE)
        .build()
}

pub fn use_cases_from_procedure(procedure_name: &str, content: &str) -> Prompt {
    let user = PromptBuilder::new()
        .section(
            &format!("Stored procedure {}", procedure_name),
            "Extract the use cases implemented by this stored procedure:",
        )
        .code("sql", content)
        .build();

    Prompt::new(use_case_system("SQL Server stored procedures")).user(user)
}

pub fn use_cases_from_app_file(file: &AppFile) -> Prompt {
    let focus = if file.method_names.is_empty() {
        "Analyze the whole file.".to_string()
    } else {
        format!("Focus only on these methods: {}.", file.method_names.join(", "))
    };

    let user = PromptBuilder::new()
        .section(
            &format!("Application file {}", file.file_name),
            &format!("Extract the use cases implemented by this file. {}", focus),
        )
        .code(language_of(&file.file_name), &file.content)
        .build();

    Prompt::new(use_case_system("legacy application source files")).user(user)
}

fn language_of(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("java") => "java",
        Some("js") => "javascript",
        Some("ts") => "typescript",
        Some("cs") => "csharp",
        Some("sql") => "sql",
        _ => "",
    }
}

pub fn consolidate_use_cases(documents: &str) -> Prompt {
    let system = PromptBuilder::new()
        .role(
            "Business Analyst",
            "harmonizing use-case documentation written by several analysts",
        )
        .objectives(&[
            "Merge near-duplicate use cases into one, keeping every business rule",
            "Preserve the source attribution of each merged use case",
            "Order use cases following the end-to-end business flow",
        ])
        .section("Document template", USE_CASE_TEMPLATE)
        .build();

    let user = PromptBuilder::new()
        .section("Use case documents", documents)
        .custom("Respond with the single consolidated use case document in Markdown.")
        .build();

    Prompt::new(system).user(user)
}

// =============================================================================
// Diagrams
// =============================================================================

fn diagram_prompt(kind: &str, guidance: &str, use_cases: &str) -> Prompt {
    let system = PromptBuilder::new()
        .role("Software Architect", &format!("Mermaid {} diagrams", kind))
        .custom(guidance)
        .build();

    let user = PromptBuilder::new()
        .section("Use case document", use_cases)
        .custom(&format!(
            "Generate the Mermaid {} diagram for these use cases. Respond only with the Mermaid code block.",
            kind
        ))
        .build();

    Prompt::new(system).user(user)
}

pub fn sequence_diagram(use_cases: &str) -> Prompt {
    diagram_prompt(
        "sequence",
        "Show actors, application layers and database procedures as participants, \
         with one message per step of each main flow.",
        use_cases,
    )
}

pub fn flow_diagram(use_cases: &str) -> Prompt {
    diagram_prompt(
        "flowchart",
        "Show decisions as diamonds and keep alternative flows as labelled branches.",
        use_cases,
    )
}
