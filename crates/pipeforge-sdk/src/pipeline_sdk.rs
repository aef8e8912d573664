//! PipelineSdk - Main API for compiling and packaging pipelines

use crate::config::SdkConfig;
use crate::emitter::{ManifestEmitter, OutputFormat};
use crate::error::Result;
use pipeforge_compiler::{Compiler, CompilerOptions, PipelineFn};
use pipeforge_core::{ComponentSpec, OpTransformer, Workflow};
use std::path::Path;

/// Main pipeline SDK
pub struct PipelineSdk {
    config: SdkConfig,
    compiler: Compiler,
}

impl PipelineSdk {
    /// Create an SDK from a configuration
    pub fn new(config: SdkConfig) -> Self {
        Self::with_transformers(config, Vec::new())
    }

    pub(crate) fn with_transformers(config: SdkConfig, transformers: Vec<OpTransformer>) -> Self {
        let mut options = CompilerOptions::default().with_type_check(config.type_check);
        options.op_transformers = transformers;
        options.arguments = config.arguments.clone();
        options.artifact_location = config.artifact_location.clone();

        tracing::debug!(
            "creating pipeline SDK: type_check={}, output_format={:?}, {} transformers",
            config.type_check,
            config.output_format,
            options.op_transformers.len()
        );

        Self {
            config,
            compiler: Compiler::with_options(options),
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Load a component description from YAML text
    pub fn load_component(&self, text: &str) -> Result<ComponentSpec> {
        Ok(pipeforge_parser::load_component_from_text(text)?)
    }

    /// Load a component description file
    pub fn load_component_file(&self, path: impl AsRef<Path>) -> Result<ComponentSpec> {
        let path = path.as_ref();
        tracing::debug!("loading component from {}", path.display());
        Ok(pipeforge_parser::load_component_from_file(path)?)
    }

    /// Compile a pipeline into a workflow
    pub fn compile(&self, pipeline: &PipelineFn) -> Result<Workflow> {
        match self.compiler.compile(pipeline) {
            Ok(workflow) => {
                tracing::info!(
                    "compiled pipeline '{}' into {} templates",
                    pipeline.name,
                    workflow.spec.templates.len()
                );
                Ok(workflow)
            }
            Err(e) => {
                tracing::warn!("failed to compile pipeline '{}': {}", pipeline.name, e);
                Err(e.into())
            }
        }
    }

    /// Compile a pipeline and serialize it in the configured output format
    pub fn package(&self, pipeline: &PipelineFn) -> Result<Vec<u8>> {
        self.package_as(pipeline, self.config.output_format)
    }

    /// Compile a pipeline and serialize it in `format`
    pub fn package_as(&self, pipeline: &PipelineFn, format: OutputFormat) -> Result<Vec<u8>> {
        let workflow = self.compile(pipeline)?;
        ManifestEmitter::emit(&workflow, format)
    }

    /// Compile a pipeline and write it to `path`, in the format its suffix names.
    ///
    /// Nothing is written when the suffix is unsupported or compilation fails.
    pub fn compile_to_file(&self, pipeline: &PipelineFn, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        OutputFormat::from_path(path)?;
        let workflow = self.compile(pipeline)?;
        ManifestEmitter::write(&workflow, path)?;
        Ok(())
    }
}

impl Default for PipelineSdk {
    fn default() -> Self {
        Self::new(SdkConfig::default())
    }
}
