//! Per-pipeline configuration collected while tracing

use crate::ops::{LocalObjectReference, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Function applied to every operation before lowering
pub type OpTransformer = Arc<dyn Fn(Operation) -> Operation + Send + Sync>;

/// Reference to a key of a Kubernetes secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

/// S3-compatible bucket receiving output artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket: String,
    pub endpoint: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_secret: Option<SecretKeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_secret: Option<SecretKeySelector>,
}

/// Where output artifacts are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub s3: S3Location,
}

impl ArtifactLocation {
    pub fn s3(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            s3: S3Location {
                bucket: bucket.into(),
                endpoint: endpoint.into(),
                insecure: false,
                access_key_secret: None,
                secret_key_secret: None,
            },
        }
    }

    pub fn insecure(mut self) -> Self {
        self.s3.insecure = true;
        self
    }

    pub fn credentials(mut self, access_key: SecretKeySelector, secret_key: SecretKeySelector) -> Self {
        self.s3.access_key_secret = Some(access_key);
        self.s3.secret_key_secret = Some(secret_key);
        self
    }
}

/// Workflow-level settings a pipeline body can adjust while it is traced
#[derive(Clone, Default)]
pub struct PipelineConf {
    pub image_pull_secrets: Vec<LocalObjectReference>,

    /// Workflow active deadline in seconds
    pub timeout: Option<u64>,

    pub ttl_seconds_after_finished: Option<u64>,
    pub artifact_location: Option<ArtifactLocation>,
    pub op_transformers: Vec<OpTransformer>,
}

impl PipelineConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_image_pull_secrets<I, S>(&mut self, secrets: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_pull_secrets = secrets
            .into_iter()
            .map(|name| LocalObjectReference { name: name.into() })
            .collect();
        self
    }

    pub fn set_timeout(&mut self, seconds: u64) -> &mut Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn set_ttl_seconds_after_finished(&mut self, seconds: u64) -> &mut Self {
        self.ttl_seconds_after_finished = Some(seconds);
        self
    }

    pub fn set_artifact_location(&mut self, location: ArtifactLocation) -> &mut Self {
        self.artifact_location = Some(location);
        self
    }

    pub fn add_op_transformer<F>(&mut self, transformer: F) -> &mut Self
    where
        F: Fn(Operation) -> Operation + Send + Sync + 'static,
    {
        self.op_transformers.push(Arc::new(transformer));
        self
    }
}

impl fmt::Debug for PipelineConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConf")
            .field("image_pull_secrets", &self.image_pull_secrets)
            .field("timeout", &self.timeout)
            .field("ttl_seconds_after_finished", &self.ttl_seconds_after_finished)
            .field("artifact_location", &self.artifact_location)
            .field("op_transformers", &self.op_transformers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{ContainerOp, OpAttributes};

    #[test]
    fn test_conf_setters() {
        let mut conf = PipelineConf::new();
        conf.set_image_pull_secrets(["secret-a"])
            .set_timeout(3600)
            .add_op_transformer(|op| op.set_retry(2));

        assert_eq!(conf.image_pull_secrets[0].name, "secret-a");
        assert_eq!(conf.timeout, Some(3600));

        let op = (conf.op_transformers[0])(ContainerOp::new("a", "busybox").into());
        assert_eq!(op.attrs().num_retries, Some(2));
        assert!(format!("{:?}", conf).contains("op_transformers: 1"));
    }
}
