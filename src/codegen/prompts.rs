//! Code generation prompt templates

use crate::ai::{Prompt, PromptBuilder};

const CSHARP_ROLE: (&str, &str) = (
    "Senior C# Developer",
    "modernizing a legacy Transact-SQL application into .NET with Entity Framework Core",
);

fn csharp_system() -> String {
    PromptBuilder::new()
        .role(CSHARP_ROLE.0, CSHARP_ROLE.1)
        .objectives(&[
            "Produce complete, compilable class implementations",
            "Never summarize or truncate generated code",
            "Omit imports, namespaces and explanatory comments",
        ])
        .build()
}

// =============================================================================
// Entities
// =============================================================================

const ENTITY_EXAMPLE: &str = "\
class W0602_MovtoNomina : BaseMaster<int, string>
{
    [Key]
    [SDKRequired]
    public int RowId { get; set; }
    [SDKRequired]
    public int IdCompany { get; set; }
}";

/// Entity class for one table. `new_name` applies the configured rename.
pub fn entity_from_table(table_name: &str, ddl: &str, new_name: Option<&str>) -> Prompt {
    let mut user = PromptBuilder::new()
        .section(
            &format!("Table {}", table_name),
            "Map this database table to an Entity Framework Core entity:",
        )
        .code("sql", ddl)
        .section("Entity example", "Strictly follow this example:")
        .code("csharp", ENTITY_EXAMPLE)
        .custom(
            "Coding guidelines:\n\
             - The entity inherits from the BaseMaster base class.\n\
             - Use SDKRequired for required columns and SDKStringLength for varchar lengths.",
        );

    if let Some(new_name) = new_name {
        user = user.custom(&format!(
            "New name convention: the table {} is renamed to {}; name the entity after the new name.",
            table_name, new_name
        ));
    }

    let user = user
        .custom(
            "Respond with the entity name, its full class content, its DbSet signature \
             and the reference table name.",
        )
        .build();

    Prompt::new(csharp_system()).user(user)
}

// =============================================================================
// DbContext
// =============================================================================

pub fn dbcontext(signatures: &str, database_model: &str) -> Prompt {
    let user = PromptBuilder::new()
        .section(
            "Entity signatures",
            "Generate the Entity Framework DbContext class for these entities:",
        )
        .code("csharp", signatures)
        .section("Database model", database_model)
        .custom(
            "Provide the complete DbContext class. After generating it, use the tool \
             `write_class_content_to_file` to write the class content to a file.",
        )
        .build();

    Prompt::new(csharp_system()).user(user)
}

// =============================================================================
// Business Layer
// =============================================================================

/// Business layer classes for one procedure.
///
/// `class_to_be_implemented` and `parent_class` are set when the procedure is
/// a dependency placeholder left by an earlier round.
pub fn business_from_procedure(
    procedure_name: &str,
    content: &str,
    mermaid: Option<&str>,
    class_to_be_implemented: Option<&str>,
    parent_class: Option<&str>,
) -> Prompt {
    let mut user = PromptBuilder::new()
        .section(
            &format!("Stored procedure {}", procedure_name),
            "Implement the business layer that modernizes this stored procedure:",
        )
        .code("sql", content);

    if let Some(diagram) = mermaid.filter(|m| !m.trim().is_empty()) {
        user = user.section("Tables used by the procedure", diagram);
    }
    if let Some(class_name) = class_to_be_implemented {
        user = user.custom(&format!("The class to be implemented is {}.", class_name));
    }
    if let Some(parent) = parent_class.filter(|p| !p.trim().is_empty()) {
        user = user
            .section(
                "Parent class",
                "This class calls the class to be implemented:",
            )
            .code("csharp", parent);
    }

    let user = user
        .custom(
            "Coding guidelines:\n\
             - Follow SOLID principles and use dependency injection with interfaces.\n\
             - Access the DbContext directly; no repositories.\n\
             - Split each implementation into small methods.\n\
             - Leave every EXEC of another stored procedure as a call to a placeholder \
             class and list it in next_implementation.",
        )
        .build();

    Prompt::new(csharp_system()).user(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_rename_is_optional() {
        let plain = entity_from_table("w0540", "CREATE TABLE [w0540] (id INT);", None);
        assert!(!plain.turns[0].content.contains("New name convention"));

        let renamed = entity_from_table("w0540", "CREATE TABLE [w0540] (id INT);", Some("Employee"));
        assert!(renamed.turns[0]
            .content
            .contains("w0540 is renamed to Employee"));
    }

    #[test]
    fn test_business_prompt_parent_sections() {
        let entry = business_from_procedure("sp_a", "SELECT 1", None, None, None);
        assert!(!entry.turns[0].content.contains("Parent class"));

        let dependency = business_from_procedure(
            "sp_b",
            "SELECT 2",
            Some("erDiagram"),
            Some("TotalsService"),
            Some("class PayrollService {}"),
        );
        let text = &dependency.turns[0].content;
        assert!(text.contains("The class to be implemented is TotalsService."));
        assert!(text.contains("class PayrollService {}"));
        assert!(text.contains("erDiagram"));
    }
}
