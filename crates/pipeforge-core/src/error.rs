//! Error types for PipeForge Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid type description: {0}")]
    InvalidType(String),

    #[error("Missing argument '{input}' for component '{component}'")]
    MissingArgument { component: String, input: String },

    #[error("Unknown input '{input}' for component '{component}'")]
    UnknownInput { component: String, input: String },

    #[error("Task '{task}' has no output '{output}'")]
    NoSuchOutput { task: String, output: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid name '{0}': nothing left after sanitization")]
    InvalidName(String),

    #[error("Cannot find a unique name for '{0}'")]
    NameExhausted(String),

    #[error("Parameter '{0}' is already defined with a different value")]
    DuplicateParam(String),

    #[error("Invalid parameter name '{name}' on step '{step}'")]
    InvalidParamName { step: String, name: String },

    #[error("Unknown scope: {0}")]
    UnknownScope(usize),
}

pub type Result<T> = std::result::Result<T, CoreError>;
