//! Workflow assembly
//!
//! Collects the lowered templates into the final workflow document together
//! with the pipeline arguments, the pipeline description annotation and the
//! workflow-level settings of the pipeline configuration.

use crate::error::{CompileError, Result};
use pipeforge_core::manifest::workflow::SERVICE_ACCOUNT;
use pipeforge_core::manifest::{Arguments, ParameterDecl, WorkflowMetadata, WorkflowSpec, PIPELINE_SPEC_ANNOTATION};
use pipeforge_core::ops::Volume;
use pipeforge_core::param::extract_refs_from_value;
use pipeforge_core::{Operation, PipelineGraph, Template, Workflow};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Workflow compiler
pub struct WorkflowCompiler;

impl WorkflowCompiler {
    /// Assemble the workflow of `graph` from its lowered templates
    pub fn assemble(
        graph: &PipelineGraph,
        pipeline_name: &str,
        templates: Vec<Template>,
        arguments: &BTreeMap<String, String>,
    ) -> Result<Workflow> {
        let templates = Self::merge_templates(templates)?;
        let root = graph.root().name.clone();

        let mut annotations = BTreeMap::new();
        annotations.insert(
            PIPELINE_SPEC_ANNOTATION.to_string(),
            Self::pipeline_spec(graph, pipeline_name)?,
        );

        let spec = WorkflowSpec {
            entrypoint: root.clone(),
            templates,
            arguments: Self::arguments(graph, arguments),
            service_account_name: SERVICE_ACCOUNT.to_string(),
            ttl_seconds_after_finished: graph.conf.ttl_seconds_after_finished,
            image_pull_secrets: graph.conf.image_pull_secrets.clone(),
            active_deadline_seconds: graph.conf.timeout,
            volumes: Self::static_volumes(graph)?,
        };

        Ok(Workflow::new(
            WorkflowMetadata {
                generate_name: format!("{}-", root),
                annotations,
            },
            spec,
        ))
    }

    /// Deduplicate templates by name and sort them
    fn merge_templates(templates: Vec<Template>) -> Result<Vec<Template>> {
        let mut merged: BTreeMap<String, Template> = BTreeMap::new();
        for template in templates {
            match merged.get(&template.name) {
                Some(existing) if *existing == template => {}
                Some(_) => {
                    return Err(CompileError::NameCollision(format!(
                        "two different templates are named '{}'",
                        template.name
                    )))
                }
                None => {
                    merged.insert(template.name.clone(), template);
                }
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Pipeline parameters with their effective values, in declaration order
    fn arguments(graph: &PipelineGraph, arguments: &BTreeMap<String, String>) -> Arguments {
        let parameters = graph
            .params
            .iter()
            .map(|spec| ParameterDecl {
                name: spec.name.clone(),
                value: arguments.get(&spec.name).or(spec.default.as_ref()).cloned(),
            })
            .collect();
        Arguments { parameters }
    }

    fn pipeline_spec(graph: &PipelineGraph, pipeline_name: &str) -> Result<String> {
        let inputs: Vec<Value> = graph
            .params
            .iter()
            .map(|spec| {
                let mut input = Map::new();
                input.insert("name".to_string(), Value::String(spec.name.clone()));
                if let Some(param_type) = &spec.param_type {
                    input.insert("type".to_string(), param_type.to_value());
                }
                if let Some(default) = &spec.default {
                    input.insert("default".to_string(), Value::String(default.clone()));
                }
                if let Some(description) = &spec.description {
                    input.insert("description".to_string(), Value::String(description.clone()));
                }
                Value::Object(input)
            })
            .collect();

        let mut spec = json!({ "name": pipeline_name });
        if let Some(description) = &graph.description {
            spec["description"] = Value::String(description.clone());
        }
        if !inputs.is_empty() {
            spec["inputs"] = Value::Array(inputs);
        }
        Ok(serde_json::to_string(&spec)?)
    }

    /// Volumes of container steps that hold no parameter reference
    fn static_volumes(graph: &PipelineGraph) -> Result<Vec<Volume>> {
        let mut volumes: BTreeMap<String, Volume> = BTreeMap::new();
        for op in graph.ops() {
            let container = match op {
                Operation::Container(container) => container,
                Operation::Resource(_) => continue,
            };
            for volume in &container.volumes {
                let mut refs = Vec::new();
                extract_refs_from_value(&serde_json::to_value(volume)?, &mut refs);
                if !refs.is_empty() {
                    continue;
                }
                match volumes.get(&volume.name) {
                    Some(existing) if existing == volume => {}
                    Some(_) => {
                        return Err(CompileError::ConflictingDefinition(format!(
                            "volume '{}' is defined twice with different sources",
                            volume.name
                        )))
                    }
                    None => {
                        volumes.insert(volume.name.clone(), volume.clone());
                    }
                }
            }
        }
        Ok(volumes.into_values().collect())
    }
}
