//! Component specifications
//!
//! A component is a reusable, typed container step described in YAML. Its
//! command line may contain placeholders for input values and output paths,
//! which [`ComponentSpec::instantiate`] expands into a [`ContainerOp`].

use crate::error::{CoreError, Result};
use crate::ops::{BindingValue, ContainerOp};
use crate::types::TypeSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,

    pub implementation: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<TypeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputSpec {
    /// Default value as command-line text
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<TypeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub container: ContainerImplementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImplementation {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<ArgSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgSpec>,
}

/// Item of a component command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Literal(String),
    Number(serde_json::Number),
    InputValue {
        #[serde(rename = "inputValue")]
        input_value: String,
    },
    OutputPath {
        #[serde(rename = "outputPath")]
        output_path: String,
    },
    Concat {
        concat: Vec<ArgSpec>,
    },
}

/// Container path an output file is written to
pub fn output_path(output: &str) -> String {
    format!("/tmp/outputs/{}/data", output)
}

impl ComponentSpec {
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Build a container step from this component.
    ///
    /// Inputs without an argument fall back to their default; command-line
    /// items referring to an optional input that has neither are dropped.
    /// Every explicit argument is recorded as an input binding for the type
    /// checker.
    pub fn instantiate(&self, arguments: &[(&str, BindingValue)]) -> Result<ContainerOp> {
        for (name, _) in arguments {
            if self.input(name).is_none() {
                return Err(CoreError::UnknownInput {
                    component: self.name.clone(),
                    input: name.to_string(),
                });
            }
        }

        let mut values: HashMap<&str, String> = HashMap::new();
        let mut op = ContainerOp::new(&self.name, self.implementation.container.image.clone());

        for input in &self.inputs {
            let provided = arguments.iter().find(|(name, _)| *name == input.name);
            match provided {
                Some((_, value)) => {
                    values.insert(input.name.as_str(), value.as_text());
                    op = op.bind_input(input.name.clone(), input.param_type.clone(), value.clone());
                }
                None => match input.default_text() {
                    Some(default) => {
                        values.insert(input.name.as_str(), default);
                    }
                    None if input.optional => {}
                    None => {
                        return Err(CoreError::MissingArgument {
                            component: self.name.clone(),
                            input: input.name.clone(),
                        })
                    }
                },
            }
        }

        let mut expander = Expander {
            spec: self,
            values: &values,
            outputs: Vec::new(),
        };
        let command = expander.expand_all(&self.implementation.container.command)?;
        let args = expander.expand_all(&self.implementation.container.args)?;
        let outputs = expander.outputs;

        op = op.command(command).args(args);
        for output in outputs {
            let path = output_path(&output.name);
            op = match &output.param_type {
                Some(t) => op.typed_file_output(output.name.clone(), path, t.clone()),
                None => op.file_output(output.name.clone(), path),
            };
        }
        Ok(op)
    }
}

struct Expander<'a> {
    spec: &'a ComponentSpec,
    values: &'a HashMap<&'a str, String>,
    outputs: Vec<&'a OutputSpec>,
}

impl<'a> Expander<'a> {
    fn expand_all(&mut self, items: &'a [ArgSpec]) -> Result<Vec<String>> {
        let mut expanded = Vec::new();
        for item in items {
            if let Some(text) = self.expand(item)? {
                expanded.push(text);
            }
        }
        Ok(expanded)
    }

    /// `None` when the item refers to a missing optional input
    fn expand(&mut self, item: &'a ArgSpec) -> Result<Option<String>> {
        match item {
            ArgSpec::Literal(text) => Ok(Some(text.clone())),
            ArgSpec::Number(number) => Ok(Some(number.to_string())),
            ArgSpec::InputValue { input_value } => {
                if self.spec.input(input_value).is_none() {
                    return Err(CoreError::UnknownInput {
                        component: self.spec.name.clone(),
                        input: input_value.clone(),
                    });
                }
                Ok(self.values.get(input_value.as_str()).cloned())
            }
            ArgSpec::OutputPath { output_path: name } => {
                let output = self.spec.output(name).ok_or_else(|| CoreError::NoSuchOutput {
                    task: self.spec.name.clone(),
                    output: name.clone(),
                })?;
                if !self.outputs.iter().any(|o| o.name == output.name) {
                    self.outputs.push(output);
                }
                Ok(Some(output_path(name)))
            }
            ArgSpec::Concat { concat } => {
                let mut joined = String::new();
                for part in concat {
                    match self.expand(part)? {
                        Some(text) => joined.push_str(&text),
                        None => return Ok(None),
                    }
                }
                Ok(Some(joined))
            }
        }
    }
}
