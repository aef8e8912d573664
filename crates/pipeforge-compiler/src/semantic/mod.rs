//! Semantic analysis module
//!
//! Reference resolution and type checking over a traced pipeline graph.

pub mod reference_resolver;
pub mod type_checker;

pub use reference_resolver::{OpInputs, ReferenceResolver};
pub use type_checker::{check_type_compatibility, validate_schema, TypeChecker};
