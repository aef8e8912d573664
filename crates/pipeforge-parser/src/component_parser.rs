//! Component parser
//!
//! Parses YAML component descriptions into [`ComponentSpec`] values.

use crate::error::{ParseError, Result};
use crate::yaml_parser::YamlParser;
use pipeforge_core::component::ArgSpec;
use pipeforge_core::{ComponentSpec, TypeSpec};
use serde_yaml::Value as YamlValue;
use std::collections::HashSet;
use std::path::Path;

/// Component parser
pub struct ComponentParser;

impl ComponentParser {
    /// Parse a component from YAML text
    pub fn parse(yaml_str: &str) -> Result<ComponentSpec> {
        let yaml = YamlParser::parse(yaml_str)?;
        Self::parse_from_yaml(&yaml)
    }

    /// Read and parse a component file
    pub fn from_file(path: impl AsRef<Path>) -> Result<ComponentSpec> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("loading component from {}", path.display());
        Self::parse(&text)
    }

    /// Parse a component from a YAML value
    pub fn parse_from_yaml(yaml: &YamlValue) -> Result<ComponentSpec> {
        YamlParser::get_string(yaml, "name")?;
        let implementation = YamlParser::get_object(yaml, "implementation")?;
        let container = YamlParser::get_object(implementation, "container").map_err(|_| ParseError::MissingField {
            field: "implementation.container".to_string(),
        })?;
        let image = YamlParser::get_string(container, "image").map_err(|_| ParseError::MissingField {
            field: "implementation.container.image".to_string(),
        })?;
        if image.trim().is_empty() {
            return Err(ParseError::InvalidValue {
                field: "implementation.container.image".to_string(),
                message: "image must not be empty".to_string(),
            });
        }

        Self::check_unique_names(yaml, "inputs")?;
        Self::check_unique_names(yaml, "outputs")?;
        Self::check_types(yaml, "inputs")?;
        Self::check_types(yaml, "outputs")?;

        let json = YamlParser::to_json(yaml)?;
        let spec: ComponentSpec = serde_json::from_value(json).map_err(|e| ParseError::InvalidValue {
            field: "component".to_string(),
            message: e.to_string(),
        })?;

        Self::check_placeholders(&spec)?;
        log::debug!(
            "parsed component '{}' with {} inputs and {} outputs",
            spec.name,
            spec.inputs.len(),
            spec.outputs.len()
        );
        Ok(spec)
    }

    fn check_unique_names(yaml: &YamlValue, field: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, item) in YamlParser::get_optional_array(yaml, field).into_iter().flatten().enumerate() {
            let name = YamlParser::get_string(item, "name").map_err(|_| ParseError::MissingField {
                field: format!("{}[{}].name", field, index),
            })?;
            if !seen.insert(name.clone()) {
                return Err(ParseError::InvalidValue {
                    field: field.to_string(),
                    message: format!("duplicate name '{}'", name),
                });
            }
        }
        Ok(())
    }

    fn check_types(yaml: &YamlValue, field: &str) -> Result<()> {
        for item in YamlParser::get_optional_array(yaml, field).into_iter().flatten() {
            if let Some(type_value) = item.get("type") {
                TypeSpec::from_value(&YamlParser::to_json(type_value)?)?;
            }
        }
        Ok(())
    }

    fn check_placeholders(spec: &ComponentSpec) -> Result<()> {
        let container = &spec.implementation.container;
        for (field, items) in [("command", &container.command), ("args", &container.args)] {
            for item in items {
                Self::check_arg(spec, field, item)?;
            }
        }
        Ok(())
    }

    fn check_arg(spec: &ComponentSpec, field: &str, item: &ArgSpec) -> Result<()> {
        match item {
            ArgSpec::Literal(_) | ArgSpec::Number(_) => Ok(()),
            ArgSpec::InputValue { input_value } if spec.input(input_value).is_none() => {
                Err(ParseError::UnknownReference {
                    kind: "input".to_string(),
                    name: input_value.clone(),
                    field: field.to_string(),
                })
            }
            ArgSpec::OutputPath { output_path } if spec.output(output_path).is_none() => {
                Err(ParseError::UnknownReference {
                    kind: "output".to_string(),
                    name: output_path.clone(),
                    field: field.to_string(),
                })
            }
            ArgSpec::InputValue { .. } | ArgSpec::OutputPath { .. } => Ok(()),
            ArgSpec::Concat { concat } => concat.iter().try_for_each(|part| Self::check_arg(spec, field, part)),
        }
    }
}
