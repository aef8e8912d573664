//! Pipeline parameters
//!
//! A [`Parameter`] is a named placeholder for a value that is only known when
//! the workflow runs: a pipeline input or an output of an operation. Inside
//! DSL code a parameter is embedded into strings through its `Display` form,
//! a placeholder token like `{{pipelineparam:op=flip;name=output}}`. The
//! compiler scans operation fields for these tokens and rewrites them into
//! workflow engine expressions.

use crate::error::{CoreError, Result};
use crate::naming::sanitize_k8s_name;
use crate::types::TypeSpec;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

const PLACEHOLDER_PREFIX: &str = "{{pipelineparam:";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{pipelineparam:op=([^;{}]*);name=([^{}]+)\}\}").expect("valid regex")
    })
}

fn param_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w\s-]+$").expect("valid regex"))
}

/// Whether `name` may name a parameter: word characters, whitespace and dashes
pub fn is_valid_param_name(name: &str) -> bool {
    param_name_regex().is_match(name)
}

/// A named placeholder for a run-time value
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name, unique within its producer
    pub name: String,

    /// Name of the producing operation, `None` for pipeline inputs
    pub op_name: Option<String>,

    /// Literal value; a valued parameter is inlined instead of threaded through the DAG
    pub value: Option<String>,

    /// Declared type, if any
    pub param_type: Option<TypeSpec>,
}

impl Parameter {
    /// Create a pipeline-level parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_name: None,
            value: None,
            param_type: None,
        }
    }

    /// Create a parameter produced by operation `op_name`
    pub fn output(op_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_name: Some(op_name.into()),
            value: None,
            param_type: None,
        }
    }

    /// Attach a literal value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attach a declared type
    pub fn with_type(mut self, param_type: TypeSpec) -> Self {
        self.param_type = Some(param_type);
        self
    }

    /// Name used in the flattened manifest: `<op>-<name>` for outputs, `<name>` otherwise
    pub fn full_name(&self) -> String {
        match &self.op_name {
            Some(op) => format!("{}-{}", op, self.name),
            None => self.name.clone(),
        }
    }

    /// The placeholder token embedded in DSL strings
    pub fn placeholder(&self) -> String {
        format!(
            "{{{{pipelineparam:op={};name={}}}}}",
            self.op_name.as_deref().unwrap_or(""),
            self.name
        )
    }

    /// Key identifying this parameter, shared with [`ParamRef`]
    pub fn key(&self) -> ParamRef {
        ParamRef {
            op_name: self.op_name.clone(),
            name: self.name.clone(),
        }
    }

    /// Reference to this parameter as a template input
    pub fn input_reference(&self) -> String {
        format!("{{{{inputs.parameters.{}}}}}", self.full_name())
    }

    /// Reference to this parameter as an output of task `task`
    pub fn task_reference(&self, task: &str) -> String {
        format!(
            "{{{{tasks.{}.outputs.parameters.{}}}}}",
            task,
            self.full_name()
        )
    }

    /// Resolve the parameter inside a DAG scope.
    ///
    /// A valued parameter resolves to its literal. Otherwise the result is a
    /// task reference when `producer_task` names the sibling task providing
    /// the value, and an input reference of the current scope when it doesn't.
    pub fn resolve_reference(&self, producer_task: Option<&str>) -> String {
        if let Some(value) = &self.value {
            return value.clone();
        }
        match producer_task {
            Some(task) => self.task_reference(task),
            None => self.input_reference(),
        }
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name()
    }
}

impl Eq for Parameter {}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name().hash(state);
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.placeholder())
    }
}

/// A parameter reference recovered from a placeholder token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamRef {
    pub op_name: Option<String>,
    pub name: String,
}

impl ParamRef {
    /// Leftover of a placeholder token that could not be parsed
    pub fn is_malformed(&self) -> bool {
        self.name.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn full_name(&self) -> String {
        match &self.op_name {
            Some(op) => format!("{}-{}", op, self.name),
            None => self.name.clone(),
        }
    }
}

fn capture_ref(caps: &Captures<'_>) -> ParamRef {
    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    ParamRef {
        op_name: if op.is_empty() { None } else { Some(op.to_string()) },
        name: caps[2].to_string(),
    }
}

/// Extract every parameter reference from `text`, in order of appearance.
///
/// A truncated placeholder is reported as a reference whose name is the
/// leftover text, so it can never resolve.
pub fn extract_refs(text: &str) -> Vec<ParamRef> {
    let mut refs: Vec<ParamRef> = placeholder_regex()
        .captures_iter(text)
        .map(|caps| capture_ref(&caps))
        .collect();

    let rest = placeholder_regex().replace_all(text, "");
    if let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
        refs.push(ParamRef {
            op_name: None,
            name: rest[start..].to_string(),
        });
    }
    refs
}

/// Extract references from every string (keys included) of a structured value
pub fn extract_refs_from_value(value: &Value, out: &mut Vec<ParamRef>) {
    match value {
        Value::String(s) => out.extend(extract_refs(s)),
        Value::Array(items) => items.iter().for_each(|v| extract_refs_from_value(v, out)),
        Value::Object(map) => {
            for (key, v) in map {
                out.extend(extract_refs(key));
                extract_refs_from_value(v, out);
            }
        }
        _ => {}
    }
}

/// Replace every placeholder token in `text` with `resolve(token)`.
///
/// Tokens for which `resolve` returns `None` are left untouched.
pub fn substitute<F>(text: &str, resolve: &F) -> String
where
    F: Fn(&ParamRef) -> Option<String>,
{
    placeholder_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            resolve(&capture_ref(caps)).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Apply [`substitute`] to every string (keys included) of a structured value
pub fn substitute_value<F>(value: &Value, resolve: &F) -> Value
where
    F: Fn(&ParamRef) -> Option<String>,
{
    match value {
        Value::String(s) => Value::String(substitute(s, resolve)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_value(v, resolve)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (substitute(k, resolve), substitute_value(v, resolve)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Parameters known to a pipeline, keyed by their placeholder identity
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    params: BTreeMap<ParamRef, Parameter>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter.
    ///
    /// Registering an equal parameter again is a no-op. A parameter with a
    /// different value under a taken key is a [`CoreError::DuplicateParam`].
    pub fn register(&mut self, param: Parameter) -> Result<()> {
        match self.params.get(&param.key()) {
            Some(existing) if existing.value != param.value => Err(CoreError::DuplicateParam(param.full_name())),
            Some(_) => Ok(()),
            None => {
                self.params.insert(param.key(), param);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &ParamRef) -> Option<&Parameter> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &ParamRef) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }
}

/// Declaration of a pipeline function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Sanitized parameter name
    pub name: String,
    pub param_type: Option<TypeSpec>,
    pub default: Option<String>,
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: sanitize_k8s_name(name),
            param_type: None,
            default: None,
            description: None,
        }
    }

    pub fn with_type(mut self, param_type: TypeSpec) -> Self {
        self.param_type = Some(param_type);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The valueless parameter handed to the pipeline body
    pub fn parameter(&self) -> Parameter {
        let param = Parameter::new(self.name.clone());
        match &self.param_type {
            Some(t) => param.with_type(t.clone()),
            None => param,
        }
    }
}
