//! Compiler error types

use pipeforge_core::CoreError;
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// Parameter placeholder that names no known parameter or output
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Name uniquification exhausted, or two different templates under one name
    #[error("Name collision: {0}")]
    NameCollision(String),

    /// Structural type mismatch between an argument and a component input
    #[error("Type mismatch for {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Literal value rejected by a JSON schema
    #[error("Schema validation failed for {context}: {message}")]
    SchemaValidationError { context: String, message: String },

    /// Operation that cannot be lowered into a template
    #[error("Unsupported operation shape: {0}")]
    UnsupportedOperationShape(String),

    /// Two different definitions of one workflow-level object
    #[error("Conflicting definition: {0}")]
    ConflictingDefinition(String),

    /// Malformed pipeline structure
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// Manifest serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CoreError> for CompileError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NameExhausted(_) | CoreError::DuplicateParam(_) => CompileError::NameCollision(err.to_string()),
            CoreError::NoSuchOutput { .. } => CompileError::UnresolvedReference(err.to_string()),
            CoreError::InvalidType(_) => CompileError::TypeMismatch {
                context: "type description".to_string(),
                expected: "a valid type".to_string(),
                actual: err.to_string(),
            },
            _ => CompileError::InvalidPipeline(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CompileError {
    fn from(err: serde_yaml::Error) -> Self {
        CompileError::Serialization(err.to_string())
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
