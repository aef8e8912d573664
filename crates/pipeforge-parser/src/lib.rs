//! PipeForge Parser - YAML component descriptions for the PipeForge compiler
//!
//! This crate turns textual component descriptions into
//! [`pipeforge_core::ComponentSpec`] values that can be instantiated as
//! container steps.

pub mod component_parser;
pub mod error;
pub mod yaml_parser;

// Re-export main parser types
pub use component_parser::ComponentParser;
pub use error::{ParseError, Result};
pub use yaml_parser::YamlParser;

/// Load a component from YAML text
pub fn load_component_from_text(text: &str) -> Result<pipeforge_core::ComponentSpec> {
    ComponentParser::parse(text)
}

/// Load a component from a YAML file
pub fn load_component_from_file(path: impl AsRef<std::path::Path>) -> Result<pipeforge_core::ComponentSpec> {
    ComponentParser::from_file(path)
}
