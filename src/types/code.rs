//! Generated Code Records
//!
//! Structured outputs requested from the LLM during code generation. Each
//! record declares the JSON schema it is validated against.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ai::structured::OutputSchema;

// =============================================================================
// Entities
// =============================================================================

/// Entity class generated from one table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityClass {
    /// Name of the entity class
    pub name: String,
    /// Full source of the entity class
    pub content: String,
    /// Signature line, e.g. `public DbSet<Employee> Employees`
    pub signature: String,
    /// Table the entity was generated from
    pub reference_table: String,
}

impl OutputSchema for EntityClass {
    const NAME: &'static str = "EntityClass";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Name of the entity class."},
                "content": {"type": "string", "description": "Content of the entity class."},
                "signature": {
                    "type": "string",
                    "description": "Signature of the entity class in the format `public <class_name> : <type>`."
                },
                "reference_table": {
                    "type": "string",
                    "description": "Name of the reference database table for the entity class."
                }
            },
            "required": ["name", "content", "signature", "reference_table"]
        })
    }
}

// =============================================================================
// Business Code
// =============================================================================

/// Architectural layer of a generated class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassLayer {
    ServiceLayer,
    RepositoryLayer,
}

/// Whether a generated file holds an interface or its implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClassKind {
    Interface,
    #[default]
    Implementation,
}

/// Placeholder for a called procedure that is implemented in a later round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyImplementation {
    /// The called stored procedure
    pub procedure_name: String,
    /// Class that calls the dependency
    pub parent_class_name: String,
    /// Placeholder class name to implement next
    pub class_to_be_implemented: String,
}

/// One class produced from a stored procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassImplementation {
    pub name: String,
    pub namespace: String,
    pub layer: ClassLayer,
    #[serde(rename = "type", default)]
    pub kind: ClassKind,
    pub content: String,
    #[serde(default)]
    pub next_implementation: Vec<DependencyImplementation>,
}

/// Result of one business code generation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResult {
    pub class_implementations: Vec<ClassImplementation>,
}

impl OutputSchema for CodeResult {
    const NAME: &'static str = "CodeResult";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "class_implementations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "namespace": {"type": "string"},
                            "layer": {"type": "string", "enum": ["ServiceLayer", "RepositoryLayer"]},
                            "type": {"type": "string", "enum": ["Interface", "Implementation"]},
                            "content": {"type": "string"},
                            "next_implementation": {
                                "type": "array",
                                "description": "Called stored procedures left as placeholders for later rounds.",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "procedure_name": {"type": "string"},
                                        "parent_class_name": {"type": "string"},
                                        "class_to_be_implemented": {"type": "string"}
                                    },
                                    "required": ["procedure_name", "parent_class_name", "class_to_be_implemented"]
                                }
                            }
                        },
                        "required": ["name", "namespace", "layer", "type", "content", "next_implementation"]
                    }
                }
            },
            "required": ["class_implementations"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_implementation_from_llm_json() {
        let value = json!({
            "name": "PayrollService",
            "namespace": "Payroll.Services",
            "layer": "ServiceLayer",
            "type": "Implementation",
            "content": "public class PayrollService {}",
            "next_implementation": [{
                "procedure_name": "sp_calc_totals",
                "parent_class_name": "PayrollService",
                "class_to_be_implemented": "TotalsService"
            }]
        });

        let class: ClassImplementation = serde_json::from_value(value).unwrap();
        assert_eq!(class.layer, ClassLayer::ServiceLayer);
        assert_eq!(class.kind, ClassKind::Implementation);
        assert_eq!(class.next_implementation[0].procedure_name, "sp_calc_totals");
    }

    #[test]
    fn test_missing_next_implementation_defaults_to_empty() {
        let value = json!({
            "name": "IPayrollRepository",
            "namespace": "Payroll.Data",
            "layer": "RepositoryLayer",
            "type": "Interface",
            "content": "public interface IPayrollRepository {}"
        });

        let class: ClassImplementation = serde_json::from_value(value).unwrap();
        assert!(class.next_implementation.is_empty());
        assert_eq!(class.kind, ClassKind::Interface);
    }

    #[test]
    fn test_schemas_declare_required_fields() {
        let schema = EntityClass::schema();
        assert_eq!(schema["required"].as_array().map(|r| r.len()), Some(4));
        assert!(CodeResult::schema()["properties"]["class_implementations"].is_object());
    }
}
