//! Group chains
//!
//! Every operation and every recursion scope gets the chain of scope names
//! leading from the root to it (the operation name closes its own chain).
//! Two chains stripped of their common prefix give the uncommon ancestors
//! a parameter crosses between its producer and its consumer.

use crate::error::{CompileError, Result};
use crate::semantic::ReferenceResolver;
use pipeforge_core::graph::{ScopeChild, ScopeId};
use pipeforge_core::{Parameter, PipelineGraph};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct GroupAnalysis {
    /// Operation or recursion scope name -> `[root, ..., itself]`
    pub op_groups: BTreeMap<String, Vec<String>>,

    /// Non-root, non-recursive scope name -> `[root, ..., itself]`
    pub opsgroup_groups: BTreeMap<String, Vec<String>>,

    /// Parameters of every enclosing condition, per operation and recursion scope
    pub condition_params: BTreeMap<String, Vec<Parameter>>,
}

impl GroupAnalysis {
    pub fn analyze(graph: &PipelineGraph) -> Result<Self> {
        let resolver = ReferenceResolver::new(graph);
        let mut analysis = Self::default();
        let mut path = Vec::new();
        let mut conditions = Vec::new();
        analysis.walk(graph, &resolver, ScopeId::ROOT, &mut path, &mut conditions)?;
        Ok(analysis)
    }

    fn walk(
        &mut self,
        graph: &PipelineGraph,
        resolver: &ReferenceResolver<'_>,
        id: ScopeId,
        path: &mut Vec<String>,
        conditions: &mut Vec<Parameter>,
    ) -> Result<()> {
        let scope = graph.scope(id)?;
        path.push(scope.name.clone());

        let enclosing = conditions.len();
        if let Some(condition) = scope.condition() {
            for param in condition.params() {
                let param = resolver.resolve_param(param)?;
                if !conditions.contains(&param) {
                    conditions.push(param);
                }
            }
        }

        if scope.is_recursion() {
            self.op_groups.insert(scope.name.clone(), path.clone());
            self.condition_params.insert(scope.name.clone(), conditions.clone());
        } else {
            if id != ScopeId::ROOT {
                self.opsgroup_groups.insert(scope.name.clone(), path.clone());
            }
            for child in &scope.children {
                match child {
                    ScopeChild::Op(name) => {
                        let mut chain = path.clone();
                        chain.push(name.clone());
                        self.op_groups.insert(name.clone(), chain);
                        self.condition_params.insert(name.clone(), conditions.clone());
                    }
                    ScopeChild::Scope(child) => self.walk(graph, resolver, *child, path, conditions)?,
                }
            }
        }

        conditions.truncate(enclosing);
        path.pop();
        Ok(())
    }

    /// Chain of an operation, recursion scope or other scope
    pub fn chain(&self, name: &str) -> Result<&[String]> {
        self.op_groups
            .get(name)
            .or_else(|| self.opsgroup_groups.get(name))
            .map(Vec::as_slice)
            .ok_or_else(|| CompileError::InvalidPipeline(format!("'{}' is not part of the pipeline", name)))
    }

    /// Chains of `upstream` and `downstream` below their deepest common scope
    pub fn uncommon_ancestors(&self, upstream: &str, downstream: &str) -> Result<(Vec<String>, Vec<String>)> {
        let up = self.chain(upstream)?;
        let down = self.chain(downstream)?;
        let common = up.iter().zip(down.iter()).take_while(|(a, b)| a == b).count();
        Ok((up[common..].to_vec(), down[common..].to_vec()))
    }

    pub fn condition_params(&self, name: &str) -> &[Parameter] {
        self.condition_params.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
