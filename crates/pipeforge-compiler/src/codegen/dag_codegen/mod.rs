//! DAG template generation
//!
//! Every scope except recursion scopes becomes a DAG template whose tasks
//! are its child operations and child scopes. Recursion scopes become tasks
//! invoking the template of the scope they re-enter.

pub mod ancestry;
pub mod dependencies;
pub mod io;

pub use ancestry::GroupAnalysis;
pub use dependencies::Dependencies;
pub use io::ScopeIo;

use crate::error::Result;
use pipeforge_core::graph::{Operand, Scope, ScopeChild};
use pipeforge_core::manifest::{
    Arguments, DagTask, DagTemplate, Inputs, OutputParameter, Outputs, ParameterDecl, Template, ValueFrom,
};
use pipeforge_core::PipelineGraph;
use std::collections::BTreeSet;

fn task_reference(task: &str, full_name: &str) -> String {
    format!("{{{{tasks.{}.outputs.parameters.{}}}}}", task, full_name)
}

fn input_reference(full_name: &str) -> String {
    format!("{{{{inputs.parameters.{}}}}}", full_name)
}

/// DAG template compiler
pub struct DagTemplateCompiler<'a> {
    graph: &'a PipelineGraph,
    io: &'a ScopeIo,
    dependencies: &'a Dependencies,
}

impl<'a> DagTemplateCompiler<'a> {
    pub fn new(graph: &'a PipelineGraph, io: &'a ScopeIo, dependencies: &'a Dependencies) -> Self {
        Self {
            graph,
            io,
            dependencies,
        }
    }

    /// One template per non-recursive scope, root first
    pub fn compile_all(&self) -> Result<Vec<Template>> {
        self.graph
            .scopes()
            .iter()
            .filter(|scope| !scope.is_recursion())
            .map(|scope| self.compile_scope(scope))
            .collect()
    }

    pub fn compile_scope(&self, scope: &Scope) -> Result<Template> {
        let inputs = self.io.inputs_of(&scope.name).map(|entries| {
            let names: BTreeSet<&String> = entries.iter().map(|(name, _)| name).collect();
            Inputs {
                parameters: names.into_iter().map(|name| ParameterDecl::named(name.clone())).collect(),
            }
        });

        let outputs = self.io.outputs_of(&scope.name).map(|entries| Outputs {
            parameters: entries
                .iter()
                .filter_map(|(name, provider)| {
                    provider.as_ref().map(|task| OutputParameter {
                        name: name.clone(),
                        value_from: ValueFrom::parameter(task_reference(task, name)),
                    })
                })
                .collect(),
            artifacts: Vec::new(),
        });

        let mut tasks = Vec::new();
        for child in &scope.children {
            tasks.push(self.compile_task(child)?);
        }
        tasks.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Template {
            name: scope.name.clone(),
            dag: Some(DagTemplate { tasks }),
            inputs,
            outputs: outputs.filter(|o| !o.parameters.is_empty()),
            ..Default::default()
        })
    }

    fn compile_task(&self, child: &ScopeChild) -> Result<DagTask> {
        let (key, template, when, recursion) = match child {
            ScopeChild::Op(name) => (name.clone(), name.clone(), None, None),
            ScopeChild::Scope(id) => {
                let scope = self.graph.scope(*id)?;
                let when = match scope.condition() {
                    Some(condition) => Some(format!(
                        "{} {} {}",
                        self.resolve_operand(&condition.lhs, &scope.name),
                        condition.operator,
                        self.resolve_operand(&condition.rhs, &scope.name)
                    )),
                    None => None,
                };
                match scope.recursion_target() {
                    Some(target) => {
                        let target = self.graph.scope(target)?;
                        (scope.name.clone(), target.name.clone(), when, Some((scope, target)))
                    }
                    None => (scope.name.clone(), scope.name.clone(), when, None),
                }
            }
        };

        let dependencies = self
            .dependencies
            .get(&key)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();

        let arguments = self.io.inputs_of(&key).map(|entries| {
            let mut parameters: Vec<ParameterDecl> = entries
                .iter()
                .map(|(name, provider)| {
                    let argument_name = match recursion {
                        Some((scope, target)) => Self::recursion_argument_name(scope, target, name),
                        None => name.clone(),
                    };
                    let value = match provider {
                        Some(task) => task_reference(task, name),
                        None => input_reference(name),
                    };
                    ParameterDecl::with_value(argument_name, value)
                })
                .collect();
            parameters.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));
            parameters.dedup();
            Arguments { parameters }
        });

        Ok(DagTask {
            name: template.clone(),
            template,
            when,
            dependencies,
            arguments,
        })
    }

    /// Name of the target scope input receiving the recursion argument `full_name`
    fn recursion_argument_name(scope: &Scope, target: &Scope, full_name: &str) -> String {
        scope
            .inputs
            .iter()
            .position(|input| input.full_name() == full_name)
            .and_then(|i| target.inputs.get(i))
            .map(|input| input.full_name())
            .unwrap_or_else(|| full_name.to_string())
    }

    /// Render a condition operand inside the scope holding the condition task
    fn resolve_operand(&self, operand: &Operand, condition_scope: &str) -> String {
        let param = match operand {
            Operand::Literal(value) => return value.clone(),
            Operand::Param(param) => param,
        };
        let resolved = self
            .graph
            .lookup_param(&param.key())
            .filter(|known| known.value.is_some())
            .unwrap_or(param);
        if let Some(value) = &resolved.value {
            return value.clone();
        }

        let full_name = param.full_name();
        let provider = self.io.inputs_of(condition_scope).and_then(|entries| {
            entries
                .iter()
                .filter(|(name, _)| *name == full_name)
                .find_map(|(_, task)| task.clone())
        });
        param.resolve_reference(provider.as_deref())
    }
}
