//! Task dependencies
//!
//! Every data dependency and every explicit `after` becomes an edge between
//! the first uncommon ancestors of the producer and the consumer, so the
//! edge lands in the DAG template that contains both.

use super::ancestry::GroupAnalysis;
use crate::error::{CompileError, Result};
use crate::semantic::OpInputs;
use pipeforge_core::{OpAttributes, PipelineGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Task name -> names of the sibling tasks it waits for
pub type Dependencies = BTreeMap<String, BTreeSet<String>>;

pub fn compute(graph: &PipelineGraph, analysis: &GroupAnalysis, op_inputs: &OpInputs) -> Result<Dependencies> {
    let mut dependencies = Dependencies::new();

    for op in graph.ops() {
        let mut upstream: BTreeSet<String> = op_inputs
            .get(op.name())
            .into_iter()
            .flatten()
            .chain(analysis.condition_params(op.name()))
            .filter_map(|p| p.op_name.clone())
            .collect();
        upstream.extend(op.attrs().dependent_names.iter().cloned());
        add_edges(&mut dependencies, analysis, op.name(), &upstream)?;
    }

    for scope in graph.scopes() {
        let mut upstream: BTreeSet<String> = scope.dependent_names.iter().cloned().collect();
        if let Some(condition) = scope.condition() {
            upstream.extend(condition.params().into_iter().filter_map(|p| p.op_name.clone()));
        }
        if scope.is_recursion() {
            upstream.extend(
                scope
                    .inputs
                    .iter()
                    .chain(analysis.condition_params(&scope.name))
                    .filter_map(|p| p.op_name.clone()),
            );
        }
        add_edges(&mut dependencies, analysis, &scope.name, &upstream)?;
    }

    Ok(dependencies)
}

fn add_edges(
    dependencies: &mut Dependencies,
    analysis: &GroupAnalysis,
    downstream: &str,
    upstream: &BTreeSet<String>,
) -> Result<()> {
    for producer in upstream {
        let (up, down) = analysis.uncommon_ancestors(producer, downstream)?;
        match (up.first(), down.first()) {
            (Some(from), Some(to)) => {
                dependencies.entry(to.clone()).or_default().insert(from.clone());
            }
            _ => {
                return Err(CompileError::InvalidPipeline(format!(
                    "'{}' cannot depend on '{}'",
                    downstream, producer
                )))
            }
        }
    }
    Ok(())
}
