//! Operation transformers

use pipeforge_core::ops::EnvVar;
use pipeforge_core::{OpAttributes, OpTransformer, Operation, PipelineGraph};
use std::sync::Arc;

/// Pod label enabling [`add_pod_env`]
pub const ADD_POD_ENV_LABEL: &str = "add-pod-env";

/// Expose the pod name and namespace to containers labelled `add-pod-env: "true"`
pub fn add_pod_env(op: Operation) -> Operation {
    match op {
        Operation::Container(container)
            if container.attrs().pod_labels.get(ADD_POD_ENV_LABEL).map(String::as_str) == Some("true") =>
        {
            Operation::Container(
                container
                    .add_env_variable(EnvVar::from_field("KFP_POD_NAME", "metadata.name"))
                    .add_env_variable(EnvVar::from_field("KFP_NAMESPACE", "metadata.namespace")),
            )
        }
        other => other,
    }
}

/// Builtin transformers, applied before any user transformer
pub fn builtin_transformers() -> Vec<OpTransformer> {
    let pod_env: OpTransformer = Arc::new(add_pod_env);
    vec![pod_env]
}

/// Apply `transformers` in order to every operation of the graph
pub fn apply_transformers(graph: &mut PipelineGraph, transformers: &[OpTransformer]) {
    if transformers.is_empty() {
        return;
    }
    log::debug!("applying {} operation transformers", transformers.len());
    graph.map_ops(|op| transformers.iter().fold(op, |op, transform| transform(op)));
}
