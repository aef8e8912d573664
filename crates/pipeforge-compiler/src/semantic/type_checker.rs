//! Type checker
//!
//! Compares the declared type of every argument bound to a component input
//! or to a nested pipeline parameter with the type it expects, and validates
//! literal values of schema-typed inputs and parameters with JSON Schema.

use super::reference_resolver::ReferenceResolver;
use crate::error::{CompileError, Result};
use jsonschema::validator_for;
use pipeforge_core::ops::{BindingValue, InputBinding};
use pipeforge_core::{OpAttributes, Operation, Parameter, PipelineGraph, TypeSpec};
use serde_json::Value;
use std::collections::BTreeMap;

/// Check that `actual` is structurally compatible with `expected`.
///
/// A type with an empty name matches anything. Named types must agree on
/// their name and every property; schema types on their name and schema.
pub fn check_type_compatibility(context: &str, expected: &TypeSpec, actual: &TypeSpec) -> Result<()> {
    if expected.name().is_empty() || actual.name().is_empty() {
        return Ok(());
    }

    let compatible = match (expected, actual) {
        (
            TypeSpec::Named { name: a, properties: pa },
            TypeSpec::Named { name: b, properties: pb },
        ) => a == b && pa == pb,
        (TypeSpec::Schema { name: a, schema: sa }, TypeSpec::Schema { name: b, schema: sb }) => a == b && sa == sb,
        _ => false,
    };

    if compatible {
        Ok(())
    } else {
        Err(CompileError::TypeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Validate a literal against a JSON schema.
///
/// String schemas see the literal as a string; other schemas see it parsed
/// as JSON, falling back to a string when it isn't valid JSON.
pub fn validate_schema(context: &str, schema: &Value, literal: &str) -> Result<()> {
    let instance = if schema.get("type").and_then(Value::as_str) == Some("string") {
        Value::String(literal.to_string())
    } else {
        serde_json::from_str(literal).unwrap_or_else(|_| Value::String(literal.to_string()))
    };

    let validator = validator_for(schema).map_err(|e| CompileError::SchemaValidationError {
        context: context.to_string(),
        message: format!("invalid schema: {}", e),
    })?;

    validator
        .validate(&instance)
        .map_err(|e| CompileError::SchemaValidationError {
            context: context.to_string(),
            message: e.to_string(),
        })
}

/// Type checker over a traced pipeline
pub struct TypeChecker<'a> {
    graph: &'a PipelineGraph,
    arguments: &'a BTreeMap<String, String>,
}

impl<'a> TypeChecker<'a> {
    /// `arguments` override pipeline parameter defaults
    pub fn new(graph: &'a PipelineGraph, arguments: &'a BTreeMap<String, String>) -> Self {
        Self { graph, arguments }
    }

    pub fn check(&self) -> Result<()> {
        self.check_pipeline_params()?;
        self.check_bindings()?;
        self.check_call_bindings()?;
        log::debug!("type check passed for pipeline '{}'", self.graph.name);
        Ok(())
    }

    /// Validate the effective value of every schema-typed pipeline parameter
    pub fn check_pipeline_params(&self) -> Result<()> {
        for spec in &self.graph.params {
            let schema = match &spec.param_type {
                Some(TypeSpec::Schema { schema, .. }) => schema,
                _ => continue,
            };
            let value = self.arguments.get(&spec.name).or(spec.default.as_ref());
            if let Some(value) = value {
                validate_schema(&format!("pipeline parameter '{}'", spec.name), schema, value)?;
            }
        }
        Ok(())
    }

    /// Check the arguments bound to component inputs, operations in name order
    pub fn check_bindings(&self) -> Result<()> {
        let resolver = ReferenceResolver::new(self.graph);
        for op in self.graph.ops() {
            let container = match op {
                Operation::Container(container) => container,
                Operation::Resource(_) => continue,
            };
            for binding in &container.bindings {
                self.check_binding(&resolver, op, binding)?;
            }
        }
        Ok(())
    }

    /// Check the arguments of nested pipeline calls and recursive calls
    /// against the parameters the invoked function declares
    pub fn check_call_bindings(&self) -> Result<()> {
        let resolver = ReferenceResolver::new(self.graph);
        for scope in self.graph.scopes() {
            let declared = match scope.recursion_target() {
                Some(target) => &self.graph.scope(target)?.params,
                None => &scope.params,
            };
            for (spec, argument) in declared.iter().zip(&scope.inputs) {
                let expected = match &spec.param_type {
                    Some(expected) => expected,
                    None => continue,
                };
                let context = format!("parameter '{}' of '{}'", spec.name, scope.name);
                self.check_argument(&resolver, &context, expected, argument)?;
            }
        }
        Ok(())
    }

    fn check_argument(
        &self,
        resolver: &ReferenceResolver<'_>,
        context: &str,
        expected: &TypeSpec,
        argument: &Parameter,
    ) -> Result<()> {
        let resolved = resolver.resolve_param(argument)?;
        if let (Some(value), TypeSpec::Schema { schema, .. }) = (&resolved.value, expected) {
            return validate_schema(context, schema, value);
        }
        match argument.param_type.as_ref().or(resolved.param_type.as_ref()) {
            Some(actual) => check_type_compatibility(context, expected, actual),
            None => Ok(()),
        }
    }

    fn check_binding(&self, resolver: &ReferenceResolver<'_>, op: &Operation, binding: &InputBinding) -> Result<()> {
        let expected = match &binding.expected {
            Some(expected) => expected,
            None => return Ok(()),
        };
        let context = format!("input '{}' of '{}'", binding.input, op.name());

        match &binding.value {
            BindingValue::Param(param) => self.check_argument(resolver, &context, expected, param),
            BindingValue::Literal(value) => match expected {
                TypeSpec::Schema { schema, .. } => validate_schema(&context, schema, value),
                TypeSpec::Named { .. } => Ok(()),
            },
        }
    }
}
