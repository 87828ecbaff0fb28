pub mod code;
pub mod domain;
pub mod error;

pub use code::{
    ClassImplementation, ClassKind, ClassLayer, CodeResult, DependencyImplementation, EntityClass,
};
pub use domain::{
    AppFile, CallGraphEdge, Procedure, ProcedureAnalysis, Table, TableAccess, TableReference,
};
pub use error::{ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt, WeaveError};
