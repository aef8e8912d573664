//! Kubernetes object fragments copied into templates
//!
//! These mirror the subset of the Kubernetes API that operations carry:
//! environment variables, volumes, tolerations, resource requirements and
//! extra containers. They serialize in the API's camelCase form and omit
//! empty fields, so a template contains exactly what the user set.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Container environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<Value>,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        }
    }

    /// Variable populated from a pod field, e.g. `metadata.name`
    pub fn from_field(name: impl Into<String>, field_path: &str) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(json!({ "fieldRef": { "fieldPath": field_path } })),
        }
    }

    /// Variable populated from a key of a secret
    pub fn from_secret(name: impl Into<String>, secret: &str, key: &str) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(json!({ "secretKeyRef": { "name": secret, "key": key } })),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
}

impl VolumeMount {
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: None,
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Pod volume; the source (`persistentVolumeClaim`, `secret`, ...) is kept as raw fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,

    #[serde(flatten)]
    pub source: Map<String, Value>,
}

impl Volume {
    pub fn new(name: impl Into<String>, source_kind: &str, source: Value) -> Self {
        let mut map = Map::new();
        map.insert(source_kind.to_string(), source);
        Self {
            name: name.into(),
            source: map,
        }
    }

    pub fn pvc(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        let claim: String = claim_name.into();
        Self::new(name, "persistentVolumeClaim", json!({ "claimName": claim }))
    }

    pub fn secret(name: impl Into<String>, secret_name: &str) -> Self {
        Self::new(name, "secret", json!({ "secretName": secret_name }))
    }

    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self::new(name, "emptyDir", json!({}))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<i64>,
}

impl Toleration {
    /// `key operator value` toleration with the given effect
    pub fn new(key: &str, operator: &str, value: &str, effect: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            operator: Some(operator.to_string()),
            value: Some(value.to_string()),
            effect: Some(effect.to_string()),
            toleration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

/// Extra container run next to (sidecar) or before (init container) the main one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContainer {
    pub name: String,
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Share the main container's volume mounts
    #[serde(default, skip_serializing_if = "is_false")]
    pub mirror_volume_mounts: bool,
}

impl UserContainer {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            env: Vec::new(),
            volume_mounts: Vec::new(),
            resources: None,
            mirror_volume_mounts: false,
        }
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_env_variable(mut self, env: EnvVar) -> Self {
        self.env.push(env);
        self
    }

    pub fn mirror_volume_mounts(mut self) -> Self {
        self.mirror_volume_mounts = true;
        self
    }
}

/// Reference to a secret by name, used for image pull secrets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}
