//! Field accessors over untyped YAML documents.
//!
//! Component files are walked as `serde_yaml::Value` before being turned
//! into typed specs, so missing fields can be reported by name.

use crate::error::{ParseError, Result};
use serde_yaml::Value as YamlValue;

/// Helpers for reading component documents
pub struct YamlParser;

impl YamlParser {
    /// Parse a single YAML document
    pub fn parse(yaml_str: &str) -> Result<YamlValue> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    /// String field that must be present
    pub fn get_string(obj: &YamlValue, field: &str) -> Result<String> {
        obj.get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ParseError::MissingField {
                field: field.to_string(),
            })
    }

    /// Sequence field, `None` when absent or not a list
    pub fn get_optional_array<'a>(obj: &'a YamlValue, field: &str) -> Option<&'a Vec<YamlValue>> {
        obj.get(field).and_then(|v| v.as_sequence())
    }

    /// Mapping field that must be present
    pub fn get_object<'a>(obj: &'a YamlValue, field: &str) -> Result<&'a YamlValue> {
        obj.get(field)
            .filter(|v| v.is_mapping())
            .ok_or_else(|| ParseError::MissingField {
                field: field.to_string(),
            })
    }

    /// Convert a YAML value into JSON; mapping keys must be strings
    pub fn to_json(value: &YamlValue) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|e| ParseError::InvalidValue {
            field: "<document>".to_string(),
            message: e.to_string(),
        })
    }
}
