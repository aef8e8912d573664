//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Component parser error
    #[error("Parser error: {0}")]
    ParseError(#[from] pipeforge_parser::error::ParseError),

    /// Compiler error
    #[error("Compiler error: {0}")]
    CompileError(#[from] pipeforge_compiler::error::CompileError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Output path with a suffix no emitter handles
    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),

    /// Manifest serialization or archive failure
    #[error("Packaging error: {0}")]
    PackagingError(String),
}

impl From<serde_yaml::Error> for SdkError {
    fn from(err: serde_yaml::Error) -> Self {
        SdkError::PackagingError(err.to_string())
    }
}

impl From<zip::result::ZipError> for SdkError {
    fn from(err: zip::result::ZipError) -> Self {
        SdkError::PackagingError(err.to_string())
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
