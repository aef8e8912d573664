//! Kubernetes resource steps

use super::{dedup_refs, OpAttributes, OpAttrs};
use crate::error::{CoreError, Result};
use crate::param::{extract_refs, extract_refs_from_value, ParamRef, Parameter};
use serde_json::{json, Value};

/// Actions the workflow engine can perform on a resource
pub const RESOURCE_ACTIONS: &[&str] = &["create", "apply", "delete", "get", "replace", "patch"];

/// A step that acts on a Kubernetes resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceOp {
    pub attrs: OpAttrs,
    pub resource: Value,
    pub action: String,
    pub success_condition: Option<String>,
    pub failure_condition: Option<String>,

    /// `key -> JSON-path query`, in declaration order
    pub attribute_outputs: Vec<(String, String)>,
}

impl ResourceOp {
    pub fn new(name: &str, resource: Value) -> Self {
        Self {
            attrs: OpAttrs::new(name),
            resource,
            action: "create".to_string(),
            success_condition: None,
            failure_condition: None,
            attribute_outputs: Vec::new(),
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn success_condition(mut self, condition: impl Into<String>) -> Self {
        self.success_condition = Some(condition.into());
        self
    }

    pub fn failure_condition(mut self, condition: impl Into<String>) -> Self {
        self.failure_condition = Some(condition.into());
        self
    }

    pub fn attribute_output(mut self, key: impl Into<String>, query: impl Into<String>) -> Self {
        let key = key.into();
        let query = query.into();
        match self.attribute_outputs.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = query,
            None => self.attribute_outputs.push((key, query)),
        }
        self
    }

    /// Implicit `manifest` and `name` outputs followed by the attribute outputs
    pub fn output_queries(&self) -> Vec<(String, String)> {
        let mut queries = vec![
            ("manifest".to_string(), "{}".to_string()),
            ("name".to_string(), "{.metadata.name}".to_string()),
        ];
        queries.extend(
            self.attribute_outputs
                .iter()
                .filter(|(k, _)| k != "manifest" && k != "name")
                .cloned(),
        );
        queries
    }

    pub fn outputs(&self) -> Vec<Parameter> {
        self.output_queries()
            .into_iter()
            .map(|(key, _)| Parameter::output(self.attrs.name.clone(), key))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if !RESOURCE_ACTIONS.contains(&self.action.as_str()) {
            return Err(CoreError::InvalidValue(format!(
                "resource step '{}' has unsupported action '{}'",
                self.attrs.human_name, self.action
            )));
        }
        if !self.resource.is_object() {
            return Err(CoreError::InvalidValue(format!(
                "resource step '{}' needs a resource object",
                self.attrs.human_name
            )));
        }
        Ok(())
    }

    pub fn referenced_params(&self) -> Vec<ParamRef> {
        let mut refs = Vec::new();
        for (_, query) in &self.attribute_outputs {
            refs.extend(extract_refs(query));
        }
        extract_refs_from_value(&self.resource, &mut refs);
        for condition in self.success_condition.iter().chain(self.failure_condition.iter()) {
            refs.extend(extract_refs(condition));
        }
        self.attrs.collect_refs(&mut refs);
        dedup_refs(refs)
    }
}

impl OpAttributes for ResourceOp {
    fn attrs(&self) -> &OpAttrs {
        &self.attrs
    }

    fn attrs_mut(&mut self) -> &mut OpAttrs {
        &mut self.attrs
    }
}

/// Builder for a resource step creating a persistent volume claim
#[derive(Debug, Clone)]
pub struct VolumeOp {
    name: String,
    resource_name: String,
    size: String,
    modes: Vec<String>,
    storage_class: Option<String>,
    annotations: Vec<(String, String)>,
}

impl VolumeOp {
    pub fn new(name: &str, resource_name: &str, size: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            resource_name: resource_name.to_string(),
            size: size.into(),
            modes: vec!["ReadWriteMany".to_string()],
            storage_class: None,
            annotations: Vec::new(),
        }
    }

    pub fn modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = modes.into_iter().map(Into::into).collect();
        self
    }

    pub fn storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> ResourceOp {
        let mut metadata = json!({ "name": format!("{{{{workflow.name}}}}-{}", self.resource_name) });
        if !self.annotations.is_empty() {
            let annotations: serde_json::Map<String, Value> = self
                .annotations
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            metadata["annotations"] = Value::Object(annotations);
        }

        let mut spec = json!({
            "accessModes": self.modes,
            "resources": { "requests": { "storage": self.size } },
        });
        if let Some(storage_class) = self.storage_class {
            spec["storageClassName"] = Value::String(storage_class);
        }

        let resource = json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": metadata,
            "spec": spec,
        });

        ResourceOp::new(&self.name, resource)
            .action("create")
            .attribute_output("size", "{.status.capacity.storage}")
    }
}

impl From<VolumeOp> for ResourceOp {
    fn from(op: VolumeOp) -> Self {
        op.build()
    }
}
