//! Scope inputs and outputs
//!
//! A parameter consumed away from its producer is threaded through every
//! scope in between: it becomes an output of each scope on the producer's
//! side and an input of each scope on the consumer's side. Entries pair the
//! parameter's full name with the sibling task providing it, if any.

use super::ancestry::GroupAnalysis;
use crate::error::Result;
use crate::semantic::{OpInputs, ReferenceResolver};
use pipeforge_core::{Parameter, PipelineGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Scope or operation name -> `(parameter full name, providing task)`
pub type GroupIo = BTreeMap<String, BTreeSet<(String, Option<String>)>>;

#[derive(Debug, Clone, Default)]
pub struct ScopeIo {
    pub inputs: GroupIo,
    pub outputs: GroupIo,
}

impl ScopeIo {
    pub fn compute(graph: &PipelineGraph, analysis: &GroupAnalysis, op_inputs: &OpInputs) -> Result<Self> {
        let mut io = Self::default();

        for (op_name, inputs) in op_inputs {
            let params = inputs.iter().chain(analysis.condition_params(op_name));
            for param in params {
                if param.value.is_some() {
                    continue;
                }
                match &param.op_name {
                    Some(producer) => io.thread(analysis, param, producer, op_name, false)?,
                    None => io.add_to_chain(analysis, param, op_name)?,
                }
            }
        }

        let resolver = ReferenceResolver::new(graph);
        // A condition task evaluates its own `when`, whatever its body holds
        for scope in graph.scopes() {
            let condition = match scope.condition() {
                Some(condition) => condition,
                None => continue,
            };
            for param in condition.params() {
                let param = resolver.resolve_param(param)?;
                if param.value.is_some() {
                    continue;
                }
                match &param.op_name {
                    Some(producer) => io.thread(analysis, &param, producer, &scope.name, false)?,
                    None => io.add_to_chain(analysis, &param, &scope.name)?,
                }
            }
        }

        for scope in graph.scopes().iter().filter(|s| s.is_recursion()) {
            let mut params = Vec::new();
            for input in &scope.inputs {
                params.push((resolver.resolve_param(input)?, false));
            }
            for param in analysis.condition_params(&scope.name) {
                params.push((param.clone(), true));
            }

            for (param, is_condition_param) in params {
                if param.value.is_some() {
                    continue;
                }
                match &param.op_name {
                    Some(producer) => io.thread(analysis, &param, producer, &scope.name, is_condition_param)?,
                    None if !is_condition_param => io.add_to_chain(analysis, &param, &scope.name)?,
                    None => {}
                }
            }
        }

        Ok(io)
    }

    /// Thread `param` from `producer` down to `consumer`.
    ///
    /// A condition parameter of a recursion is not handed to the recursion
    /// itself, the recursive call evaluates its condition in the caller.
    fn thread(
        &mut self,
        analysis: &GroupAnalysis,
        param: &Parameter,
        producer: &str,
        consumer: &str,
        is_condition_param: bool,
    ) -> Result<()> {
        let full_name = param.full_name();
        let (upstream, downstream) = analysis.uncommon_ancestors(producer, consumer)?;

        for (i, group) in downstream.iter().enumerate() {
            let entry = if i == 0 {
                (full_name.clone(), upstream.first().cloned())
            } else if i == downstream.len() - 1 && is_condition_param {
                continue;
            } else {
                (full_name.clone(), None)
            };
            self.inputs.entry(group.clone()).or_default().insert(entry);
        }

        for (i, group) in upstream.iter().enumerate() {
            let provider = upstream.get(i + 1).cloned();
            self.outputs
                .entry(group.clone())
                .or_default()
                .insert((full_name.clone(), provider));
        }
        Ok(())
    }

    /// Pipeline inputs flow from the root into every scope down to `consumer`
    fn add_to_chain(&mut self, analysis: &GroupAnalysis, param: &Parameter, consumer: &str) -> Result<()> {
        let full_name = param.full_name();
        for group in analysis.chain(consumer)? {
            self.inputs
                .entry(group.clone())
                .or_default()
                .insert((full_name.clone(), None));
        }
        Ok(())
    }

    pub fn inputs_of(&self, name: &str) -> Option<&BTreeSet<(String, Option<String>)>> {
        self.inputs.get(name).filter(|set| !set.is_empty())
    }

    pub fn outputs_of(&self, name: &str) -> Option<&BTreeSet<(String, Option<String>)>> {
        self.outputs.get(name).filter(|set| !set.is_empty())
    }
}
