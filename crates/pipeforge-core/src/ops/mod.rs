//! Operation model
//!
//! An operation is one node of the pipeline graph: either a container step
//! ([`ContainerOp`]) or a Kubernetes resource step ([`ResourceOp`]). Both share
//! the pod-level attributes in [`OpAttrs`], set through the builder-style
//! [`OpAttributes`] trait so that transformers can work on any operation.

pub mod container;
pub mod k8s;
pub mod resource;

pub use container::{BindingValue, ContainerOp, FileOutput, InputBinding};
pub use k8s::{EnvVar, LocalObjectReference, ResourceRequirements, Toleration, UserContainer, Volume, VolumeMount};
pub use resource::{ResourceOp, VolumeOp};

use crate::graph::TaskHandle;
use crate::param::{extract_refs, extract_refs_from_value, ParamRef, Parameter};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Pod-level attributes shared by every operation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpAttrs {
    /// Sanitized, pipeline-unique name; assigned when the operation is added
    pub name: String,

    /// Name the operation was declared with
    pub human_name: String,

    pub display_name: Option<String>,

    /// Explicit predecessors
    pub dependent_names: Vec<String>,

    pub num_retries: Option<u32>,

    /// Active deadline in seconds
    pub timeout: Option<u64>,

    pub tolerations: Vec<Toleration>,
    pub node_selector: BTreeMap<String, String>,
    pub pod_labels: BTreeMap<String, String>,
    pub pod_annotations: BTreeMap<String, String>,
    pub affinity: Option<Value>,
}

impl OpAttrs {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            human_name: name.to_string(),
            ..Default::default()
        }
    }

    /// Placeholder references found in the attribute strings
    pub(crate) fn collect_refs(&self, out: &mut Vec<ParamRef>) {
        for map in [&self.node_selector, &self.pod_labels, &self.pod_annotations] {
            for value in map.values() {
                out.extend(extract_refs(value));
            }
        }
        scan(&self.tolerations, out);
        if let Some(affinity) = &self.affinity {
            extract_refs_from_value(affinity, out);
        }
    }
}

/// Collect placeholder references from any serializable fragment
pub(crate) fn scan<T: Serialize + ?Sized>(item: &T, out: &mut Vec<ParamRef>) {
    if let Ok(value) = serde_json::to_value(item) {
        extract_refs_from_value(&value, out);
    }
}

/// Keep the first occurrence of every reference
pub(crate) fn dedup_refs(refs: Vec<ParamRef>) -> Vec<ParamRef> {
    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

/// Builder-style setters for the shared attributes
pub trait OpAttributes: Sized {
    fn attrs(&self) -> &OpAttrs;

    fn attrs_mut(&mut self) -> &mut OpAttrs;

    fn name(&self) -> &str {
        &self.attrs().name
    }

    fn set_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.attrs_mut().display_name = Some(display_name.into());
        self
    }

    /// Run after `task` even without a data dependency
    fn after(mut self, task: &TaskHandle) -> Self {
        let deps = &mut self.attrs_mut().dependent_names;
        if !deps.contains(&task.name) {
            deps.push(task.name.clone());
        }
        self
    }

    fn set_retry(mut self, num_retries: u32) -> Self {
        self.attrs_mut().num_retries = Some(num_retries);
        self
    }

    fn set_timeout(mut self, seconds: u64) -> Self {
        self.attrs_mut().timeout = Some(seconds);
        self
    }

    fn add_toleration(mut self, toleration: Toleration) -> Self {
        self.attrs_mut().tolerations.push(toleration);
        self
    }

    fn add_node_selector_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs_mut().node_selector.insert(key.into(), value.into());
        self
    }

    fn add_pod_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs_mut().pod_labels.insert(key.into(), value.into());
        self
    }

    fn add_pod_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs_mut().pod_annotations.insert(key.into(), value.into());
        self
    }

    fn add_affinity(mut self, affinity: Value) -> Self {
        self.attrs_mut().affinity = Some(affinity);
        self
    }
}

/// A node of the pipeline graph
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Container(ContainerOp),
    Resource(ResourceOp),
}

impl Operation {
    pub fn as_container(&self) -> Option<&ContainerOp> {
        match self {
            Operation::Container(op) => Some(op),
            Operation::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceOp> {
        match self {
            Operation::Resource(op) => Some(op),
            Operation::Container(_) => None,
        }
    }

    /// Output parameters in declaration order
    pub fn outputs(&self) -> Vec<Parameter> {
        match self {
            Operation::Container(op) => op.outputs(),
            Operation::Resource(op) => op.outputs(),
        }
    }

    /// Output keys declared by the user, excluding implicit resource outputs
    pub fn declared_output_keys(&self) -> Vec<String> {
        match self {
            Operation::Container(op) => op.file_outputs.iter().map(|o| o.key.clone()).collect(),
            Operation::Resource(op) => op.attribute_outputs.iter().map(|(k, _)| k.clone()).collect(),
        }
    }

    /// Every referenced parameter, deduplicated, in first-appearance order
    pub fn referenced_params(&self) -> Vec<ParamRef> {
        match self {
            Operation::Container(op) => op.referenced_params(),
            Operation::Resource(op) => op.referenced_params(),
        }
    }
}

impl OpAttributes for Operation {
    fn attrs(&self) -> &OpAttrs {
        match self {
            Operation::Container(op) => &op.attrs,
            Operation::Resource(op) => &op.attrs,
        }
    }

    fn attrs_mut(&mut self) -> &mut OpAttrs {
        match self {
            Operation::Container(op) => &mut op.attrs,
            Operation::Resource(op) => &mut op.attrs,
        }
    }
}

impl From<ContainerOp> for Operation {
    fn from(op: ContainerOp) -> Self {
        Operation::Container(op)
    }
}

impl From<ResourceOp> for Operation {
    fn from(op: ResourceOp) -> Self {
        Operation::Resource(op)
    }
}
