//! Builder pattern for PipelineSdk

use crate::config::SdkConfig;
use crate::emitter::OutputFormat;
use crate::error::Result;
use crate::pipeline_sdk::PipelineSdk;
use pipeforge_core::{ArtifactLocation, OpTransformer, Operation};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for PipelineSdk
///
/// # Example
///
/// ```rust,ignore
/// use pipeforge_sdk::{OutputFormat, PipelineSdkBuilder};
///
/// let sdk = PipelineSdkBuilder::new()
///     .with_config_file("pipeforge.yaml")
///     .with_output_format(OutputFormat::TarGz)
///     .with_transformer(|op| op.set_retry(3))
///     .build()?;
///
/// let bytes = sdk.package(&pipeline)?;
/// ```
#[derive(Default)]
pub struct PipelineSdkBuilder {
    config: SdkConfig,
    config_file: Option<PathBuf>,
    transformers: Vec<OpTransformer>,
}

impl PipelineSdkBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML file when building.
    ///
    /// Settings made on the builder are replaced by the file's.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Enable type checking
    pub fn type_check(mut self, enable: bool) -> Self {
        self.config.type_check = enable;
        self
    }

    /// Set the default output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set the fallback artifact location
    pub fn with_artifact_location(mut self, location: ArtifactLocation) -> Self {
        self.config.artifact_location = Some(location);
        self
    }

    /// Override a pipeline parameter value
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.arguments.insert(name.into(), value.into());
        self
    }

    /// Add a transformer applied to every operation of every compiled pipeline
    pub fn with_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Operation) -> Operation + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Build the SDK
    pub fn build(self) -> Result<PipelineSdk> {
        let config = match &self.config_file {
            Some(path) => {
                tracing::info!("loading SDK configuration from {}", path.display());
                SdkConfig::from_file(path)?
            }
            None => self.config,
        };
        Ok(PipelineSdk::with_transformers(config, self.transformers))
    }
}
