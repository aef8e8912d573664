//! Reference resolution
//!
//! Maps every parameter placeholder found in operations, conditions and
//! nested pipeline arguments back to a known parameter: a pipeline input, an
//! immediate value or a declared output of an operation.

use crate::error::{CompileError, Result};
use pipeforge_core::{OpAttributes, ParamRef, Parameter, PipelineGraph};
use std::collections::BTreeMap;

/// Resolved inputs of each operation, in first-appearance order
pub type OpInputs = BTreeMap<String, Vec<Parameter>>;

pub struct ReferenceResolver<'a> {
    graph: &'a PipelineGraph,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(graph: &'a PipelineGraph) -> Self {
        Self { graph }
    }

    /// Resolve a placeholder reference
    pub fn resolve_ref(&self, reference: &ParamRef) -> Result<Parameter> {
        if reference.is_malformed() {
            return Err(CompileError::UnresolvedReference(format!(
                "malformed parameter placeholder '{}'",
                reference.name
            )));
        }
        match &reference.op_name {
            Some(op_name) => {
                let op = self.graph.op(op_name).ok_or_else(|| {
                    CompileError::UnresolvedReference(format!(
                        "'{}' refers to unknown operation '{}'",
                        reference.full_name(),
                        op_name
                    ))
                })?;
                op.outputs()
                    .into_iter()
                    .find(|p| p.name == reference.name)
                    .ok_or_else(|| {
                        CompileError::UnresolvedReference(format!(
                            "operation '{}' has no output '{}'",
                            op_name, reference.name
                        ))
                    })
            }
            None => self.graph.lookup_param(reference).cloned().ok_or_else(|| {
                CompileError::UnresolvedReference(format!("unknown pipeline parameter '{}'", reference.name))
            }),
        }
    }

    /// Resolve a parameter object; a parameter carrying its own value always resolves
    pub fn resolve_param(&self, param: &Parameter) -> Result<Parameter> {
        if param.value.is_some() {
            return Ok(param.clone());
        }
        let mut resolved = self.resolve_ref(&param.key())?;
        if resolved.param_type.is_none() {
            resolved.param_type = param.param_type.clone();
        }
        Ok(resolved)
    }

    /// Resolve every reference of the graph and return the operation inputs
    pub fn resolve(&self) -> Result<OpInputs> {
        let mut op_inputs = OpInputs::new();
        for op in self.graph.ops() {
            let mut inputs = Vec::new();
            for reference in op.referenced_params() {
                if reference.op_name.as_deref() == Some(op.name()) {
                    return Err(CompileError::InvalidPipeline(format!(
                        "operation '{}' consumes its own output '{}'",
                        op.name(),
                        reference.name
                    )));
                }
                inputs.push(self.resolve_ref(&reference)?);
            }
            for dependency in &op.attrs().dependent_names {
                self.check_dependency(op.name(), dependency)?;
            }
            op_inputs.insert(op.name().to_string(), inputs);
        }

        for scope in self.graph.scopes() {
            for param in &scope.inputs {
                self.resolve_param(param)?;
            }
            if let Some(condition) = scope.condition() {
                for param in condition.params() {
                    self.resolve_param(param)?;
                }
            }
            for dependency in &scope.dependent_names {
                self.check_dependency(&scope.name, dependency)?;
            }
        }

        log::debug!("resolved inputs of {} operations", op_inputs.len());
        Ok(op_inputs)
    }

    fn check_dependency(&self, owner: &str, dependency: &str) -> Result<()> {
        if self.graph.op(dependency).is_some() || self.graph.scope_by_name(dependency).is_some() {
            Ok(())
        } else {
            Err(CompileError::UnresolvedReference(format!(
                "'{}' runs after unknown task '{}'",
                owner, dependency
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeforge_core::graph::ScopeId;
    use pipeforge_core::{ContainerOp, ParamSpec};

    #[test]
    fn test_resolves_inputs_in_order() {
        let mut graph = PipelineGraph::new("p", None, vec![ParamSpec::new("msg")]).unwrap();
        let producer = graph
            .add_op(ScopeId::ROOT, ContainerOp::new("produce", "alpine").file_output("out", "/out").into())
            .unwrap();
        let out = producer.output().unwrap();
        let msg = Parameter::new("msg");
        graph
            .add_op(
                ScopeId::ROOT,
                ContainerOp::new("consume", "alpine").args([format!("{} {}", out, msg)]).into(),
            )
            .unwrap();

        let inputs = ReferenceResolver::new(&graph).resolve().unwrap();
        let names: Vec<String> = inputs["consume"].iter().map(Parameter::full_name).collect();
        assert_eq!(names, vec!["produce-out", "msg"]);
    }

    #[test]
    fn test_dangling_references() {
        let mut graph = PipelineGraph::new("p", None, vec![]).unwrap();
        let ghost = Parameter::new("ghost");
        graph
            .add_op(ScopeId::ROOT, ContainerOp::new("a", "alpine").args([ghost.to_string()]).into())
            .unwrap();
        assert!(matches!(
            ReferenceResolver::new(&graph).resolve(),
            Err(CompileError::UnresolvedReference(_))
        ));

        let mut graph = PipelineGraph::new("p", None, vec![]).unwrap();
        let missing_output = Parameter::output("nowhere", "out");
        graph
            .add_op(ScopeId::ROOT, ContainerOp::new("a", "alpine").args([missing_output.to_string()]).into())
            .unwrap();
        assert!(matches!(
            ReferenceResolver::new(&graph).resolve(),
            Err(CompileError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_unparsed_placeholder_is_unresolved() {
        let mut graph = PipelineGraph::new("p", None, vec![]).unwrap();
        graph
            .add_op(ScopeId::ROOT, ContainerOp::new("a", "alpine").file_output("out", "/out").into())
            .unwrap();
        graph
            .add_op(
                ScopeId::ROOT,
                ContainerOp::new("b", "alpine").args(["cat {{pipelineparam:op=a;name=out"]).into(),
            )
            .unwrap();

        let result = ReferenceResolver::new(&graph).resolve();
        assert!(matches!(result, Err(CompileError::UnresolvedReference(msg)) if msg.contains("malformed")));
    }

    #[test]
    fn test_undeclared_output_key_is_unresolved() {
        let mut graph = PipelineGraph::new("p", None, vec![]).unwrap();
        graph
            .add_op(ScopeId::ROOT, ContainerOp::new("a", "alpine").file_output("out", "/out").into())
            .unwrap();
        graph
            .add_op(
                ScopeId::ROOT,
                ContainerOp::new("b", "alpine").args(["cat {{pipelineparam:op=a;name=out.txt}}"]).into(),
            )
            .unwrap();

        assert!(matches!(
            ReferenceResolver::new(&graph).resolve(),
            Err(CompileError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut graph = PipelineGraph::new("p", None, vec![]).unwrap();
        let own = Parameter::output("a", "out");
        graph
            .add_op(
                ScopeId::ROOT,
                ContainerOp::new("a", "alpine").file_output("out", "/out").args([own.to_string()]).into(),
            )
            .unwrap();
        assert!(matches!(
            ReferenceResolver::new(&graph).resolve(),
            Err(CompileError::InvalidPipeline(_))
        ));
    }
}
