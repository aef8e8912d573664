//! Operation lowering
//!
//! Lowers a single container or resource operation into a workflow
//! template. Every placeholder token embedded in the operation is rewritten
//! into a reference to the template's own input parameter.

use crate::error::Result;
use pipeforge_core::manifest::{
    Artifact, Container, Inputs, OutputParameter, Outputs, ParameterDecl, ResourceTemplate, RetryStrategy,
    S3Artifact, Template, TemplateMetadata, ValueFrom,
};
use pipeforge_core::ops::OpAttrs;
use pipeforge_core::param::{substitute, substitute_value};
use pipeforge_core::{ArtifactLocation, ContainerOp, OpAttributes, Operation, ParamRef, Parameter, ResourceOp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Annotation carrying the display name of a task
pub const DISPLAY_NAME_ANNOTATION: &str = "pipelines.kubeflow.org/task_display_name";

/// UI artifacts every container template may produce, `(name, path)`
pub const OUTPUT_ARTIFACTS: &[(&str, &str)] = &[
    ("mlpipeline-ui-metadata", "/mlpipeline-ui-metadata.json"),
    ("mlpipeline-metrics", "/mlpipeline-metrics.json"),
];

fn input_reference(reference: &ParamRef) -> Option<String> {
    Some(format!("{{{{inputs.parameters.{}}}}}", reference.full_name()))
}

fn sub(text: &str) -> String {
    substitute(text, &input_reference)
}

/// Substitute every string of a serializable fragment
fn sub_serde<T>(item: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let value = serde_json::to_value(item)?;
    Ok(serde_json::from_value(substitute_value(&value, &input_reference))?)
}

fn sub_map(map: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), sub(v))).collect()
}

/// Operation template compiler
pub struct OpTemplateCompiler;

impl OpTemplateCompiler {
    /// Lower `op` whose resolved inputs are `inputs`
    pub fn lower(op: &Operation, inputs: &[Parameter], artifact_location: Option<&ArtifactLocation>) -> Result<Template> {
        let mut template = match op {
            Operation::Container(container) => Self::lower_container(container, artifact_location)?,
            Operation::Resource(resource) => Self::lower_resource(resource)?,
        };
        template.name = op.name().to_string();
        template.inputs = Self::input_decls(inputs);
        Self::apply_attrs(&mut template, op.attrs())?;
        Ok(template)
    }

    /// `{name}` for references, `{name, value}` for immediate values
    fn input_decls(inputs: &[Parameter]) -> Option<Inputs> {
        if inputs.is_empty() {
            return None;
        }
        let parameters = inputs
            .iter()
            .map(|param| match &param.value {
                Some(value) => ParameterDecl::with_value(param.full_name(), value.clone()),
                None => ParameterDecl::named(param.full_name()),
            })
            .collect();
        Some(Inputs { parameters })
    }

    fn lower_container(op: &ContainerOp, artifact_location: Option<&ArtifactLocation>) -> Result<Template> {
        let container = Container {
            image: sub(&op.image),
            command: op.command.iter().map(|c| sub(c)).collect(),
            args: op.args.iter().map(|a| sub(a)).collect(),
            env: sub_serde(&op.env)?,
            volume_mounts: sub_serde(&op.volume_mounts)?,
            resources: if op.resources.is_empty() {
                None
            } else {
                Some(sub_serde(&op.resources)?)
            },
        };

        let parameters = op
            .file_outputs
            .iter()
            .map(|output| OutputParameter {
                name: format!("{}-{}", op.attrs.name, output.key),
                value_from: ValueFrom::path(sub(&output.path)),
            })
            .collect();

        let artifacts = OUTPUT_ARTIFACTS
            .iter()
            .map(|(name, path)| Artifact {
                name: name.to_string(),
                path: path.to_string(),
                optional: true,
                s3: artifact_location.map(|location| S3Artifact {
                    location: location.s3.clone(),
                    key: format!("runs/{{{{workflow.uid}}}}/{{{{pod.name}}}}/{}.tgz", name),
                }),
            })
            .collect();

        let mut volumes = sub_serde(&op.volumes)?;
        volumes.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Template {
            container: Some(container),
            outputs: Some(Outputs { parameters, artifacts }),
            init_containers: sub_serde(&op.init_containers)?,
            sidecars: sub_serde(&op.resolved_sidecars())?,
            volumes,
            ..Default::default()
        })
    }

    fn lower_resource(op: &ResourceOp) -> Result<Template> {
        let resource = substitute_value(&op.resource, &input_reference);
        let manifest = serde_yaml::to_string(&resource)?;

        // Attribute outputs backed by a parameter pass the parameter through as the query
        let parameters = op
            .output_queries()
            .into_iter()
            .map(|(key, query)| OutputParameter {
                name: format!("{}-{}", op.attrs.name, key),
                value_from: ValueFrom::json_path(sub(&query)),
            })
            .collect();

        Ok(Template {
            resource: Some(ResourceTemplate {
                action: op.action.clone(),
                success_condition: op.success_condition.as_deref().map(sub),
                failure_condition: op.failure_condition.as_deref().map(sub),
                manifest,
            }),
            outputs: Some(Outputs {
                parameters,
                artifacts: Vec::new(),
            }),
            ..Default::default()
        })
    }

    fn apply_attrs(template: &mut Template, attrs: &OpAttrs) -> Result<()> {
        template.node_selector = sub_map(&attrs.node_selector);
        template.tolerations = sub_serde(&attrs.tolerations)?;
        template.affinity = attrs
            .affinity
            .as_ref()
            .map(|affinity| substitute_value(affinity, &input_reference));

        let mut annotations = sub_map(&attrs.pod_annotations);
        if let Some(display_name) = &attrs.display_name {
            annotations.insert(DISPLAY_NAME_ANNOTATION.to_string(), display_name.clone());
        }
        let labels = sub_map(&attrs.pod_labels);
        if !annotations.is_empty() || !labels.is_empty() {
            template.metadata = Some(TemplateMetadata { annotations, labels });
        }

        template.retry_strategy = attrs.num_retries.map(|limit| RetryStrategy { limit });
        template.active_deadline_seconds = attrs.timeout;
        Ok(())
    }
}
