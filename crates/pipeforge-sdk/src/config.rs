//! Configuration types for PipelineSdk

use crate::emitter::OutputFormat;
use crate::error::{Result, SdkError};
use pipeforge_core::ArtifactLocation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// SDK configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Check argument types against component inputs
    pub type_check: bool,

    /// Format used when no output path decides it
    pub output_format: OutputFormat,

    /// Artifact location for pipelines that set none
    pub artifact_location: Option<ArtifactLocation>,

    /// Pipeline parameter values overriding the defaults
    pub arguments: BTreeMap<String, String>,
}

impl SdkConfig {
    /// Create a new SDK configuration
    pub fn new() -> Self {
        Self {
            type_check: true,
            output_format: OutputFormat::Yaml,
            artifact_location: None,
            arguments: BTreeMap::new(),
        }
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| SdkError::ConfigError(e.to_string()))
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text).map_err(|e| SdkError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Enable type checking
    pub fn type_check(mut self, enable: bool) -> Self {
        self.type_check = enable;
        self
    }

    /// Set the default output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the fallback artifact location
    pub fn with_artifact_location(mut self, location: ArtifactLocation) -> Self {
        self.artifact_location = Some(location);
        self
    }

    /// Override a pipeline parameter value
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::new()
    }
}
