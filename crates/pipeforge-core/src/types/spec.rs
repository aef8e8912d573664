//! Structural and schema type descriptions
//!
//! Component authors describe types loosely: a bare string such as
//! `"Integer"`, or a one-key mapping such as `{GCSPath: {file_type: csv}}`.
//! A mapping whose properties carry an `openapi_schema_validator` entry is a
//! JSON-Schema type; its literal values are validated against that schema
//! instead of being compared by name.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Property key marking a schema-validated type
pub const SCHEMA_PROPERTY: &str = "openapi_schema_validator";

/// Type description attached to a parameter or a component input/output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum TypeSpec {
    /// Compared by name and property map
    Named {
        name: String,
        properties: BTreeMap<String, Value>,
    },

    /// Literal values are validated against `schema`
    Schema { name: String, schema: Value },
}

impl TypeSpec {
    /// A named type without properties
    pub fn named(name: impl Into<String>) -> Self {
        TypeSpec::Named {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// A named type with properties
    pub fn with_properties<I, K>(name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        TypeSpec::Named {
            name: name.into(),
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A schema-validated type
    pub fn schema(name: impl Into<String>, schema: Value) -> Self {
        TypeSpec::Schema {
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeSpec::Named { name, .. } | TypeSpec::Schema { name, .. } => name,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, TypeSpec::Schema { .. })
    }

    /// Parse a loose type description
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(TypeSpec::named(name.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (name, props) = map
                    .iter()
                    .next()
                    .ok_or_else(|| CoreError::InvalidType("empty mapping".to_string()))?;
                match props {
                    Value::Object(props) => {
                        if let Some(schema) = props.get(SCHEMA_PROPERTY) {
                            return Ok(TypeSpec::schema(name.clone(), schema.clone()));
                        }
                        Ok(TypeSpec::Named {
                            name: name.clone(),
                            properties: props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                        })
                    }
                    Value::Null => Ok(TypeSpec::named(name.clone())),
                    other => Err(CoreError::InvalidType(format!(
                        "properties of '{}' must be a mapping, got {}",
                        name, other
                    ))),
                }
            }
            other => Err(CoreError::InvalidType(other.to_string())),
        }
    }

    /// Loose form of this description, inverse of [`TypeSpec::from_value`]
    pub fn to_value(&self) -> Value {
        match self {
            TypeSpec::Named { name, properties } if properties.is_empty() => Value::String(name.clone()),
            TypeSpec::Named { name, properties } => {
                let props: Map<String, Value> = properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let mut outer = Map::new();
                outer.insert(name.clone(), Value::Object(props));
                Value::Object(outer)
            }
            TypeSpec::Schema { name, schema } => {
                let mut props = Map::new();
                props.insert(SCHEMA_PROPERTY.to_string(), schema.clone());
                let mut outer = Map::new();
                outer.insert(name.clone(), Value::Object(props));
                Value::Object(outer)
            }
        }
    }
}

impl TryFrom<Value> for TypeSpec {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        TypeSpec::from_value(&value)
    }
}

impl From<TypeSpec> for Value {
    fn from(spec: TypeSpec) -> Self {
        spec.to_value()
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
