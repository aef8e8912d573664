//! Main compiler
//!
//! Drives a pipeline function from tracing to the finished workflow.

use crate::builder::{trace, PipelineFn};
use crate::codegen::dag_codegen::dependencies;
use crate::codegen::{DagTemplateCompiler, GroupAnalysis, OpTemplateCompiler, ScopeIo, WorkflowCompiler};
use crate::error::{CompileError, Result};
use crate::semantic::{ReferenceResolver, TypeChecker};
use crate::transform::{apply_transformers, builtin_transformers};
use pipeforge_core::{ArtifactLocation, OpAttributes, OpTransformer, Operation, PipelineGraph, Workflow};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Compiler options
#[derive(Clone)]
pub struct CompilerOptions {
    /// Check argument types against component inputs
    pub type_check: bool,
    /// Transformers applied to every operation, after the builtin ones
    pub op_transformers: Vec<OpTransformer>,
    /// Pipeline parameter values overriding the defaults
    pub arguments: BTreeMap<String, String>,
    /// Artifact location used when the pipeline sets none
    pub artifact_location: Option<ArtifactLocation>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            type_check: true,
            op_transformers: Vec::new(),
            arguments: BTreeMap::new(),
            artifact_location: None,
        }
    }
}

impl CompilerOptions {
    pub fn with_type_check(mut self, enabled: bool) -> Self {
        self.type_check = enabled;
        self
    }

    pub fn with_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Operation) -> Operation + Send + Sync + 'static,
    {
        self.op_transformers.push(Arc::new(transformer));
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_artifact_location(mut self, location: ArtifactLocation) -> Self {
        self.artifact_location = Some(location);
        self
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("type_check", &self.type_check)
            .field("op_transformers", &self.op_transformers.len())
            .field("arguments", &self.arguments)
            .field("artifact_location", &self.artifact_location)
            .finish()
    }
}

/// The pipeline compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Create a new compiler instance with default options
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Create a new compiler instance with custom options
    pub fn with_options(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a pipeline function into a workflow
    pub fn compile(&self, pipeline: &PipelineFn) -> Result<Workflow> {
        log::info!("compiling pipeline '{}'", pipeline.name);

        // 1. Trace the pipeline body
        let mut graph = trace(pipeline)?;
        log::debug!(
            "traced {} operations in {} scopes",
            graph.op_count(),
            graph.scopes().len()
        );
        self.check_arguments(&graph)?;

        // 2. Reject operations that cannot be lowered
        Self::validate_ops(&graph)?;

        // 3. Builtin, compile-time and pipeline transformers, in that order;
        //    their results must still be lowerable
        let mut transformers = builtin_transformers();
        transformers.extend(self.options.op_transformers.iter().cloned());
        transformers.extend(graph.conf.op_transformers.iter().cloned());
        apply_transformers(&mut graph, &transformers);
        Self::validate_ops(&graph)?;

        // 4. Resolve every parameter reference
        let op_inputs = ReferenceResolver::new(&graph).resolve()?;

        // 5. Type check before anything is lowered
        if self.options.type_check {
            TypeChecker::new(&graph, &self.options.arguments).check()?;
        } else {
            log::debug!("type checking disabled");
        }

        // 6. Lower operations and scopes
        let analysis = GroupAnalysis::analyze(&graph)?;
        let io = ScopeIo::compute(&graph, &analysis, &op_inputs)?;
        let deps = dependencies::compute(&graph, &analysis, &op_inputs)?;

        let artifact_location = graph
            .conf
            .artifact_location
            .as_ref()
            .or(self.options.artifact_location.as_ref());
        let mut templates = Vec::with_capacity(graph.op_count() + graph.scopes().len());
        for op in graph.ops() {
            let inputs = op_inputs.get(op.name()).map(Vec::as_slice).unwrap_or(&[]);
            templates.push(OpTemplateCompiler::lower(op, inputs, artifact_location)?);
        }
        templates.extend(DagTemplateCompiler::new(&graph, &io, &deps).compile_all()?);

        // 7. Assemble the workflow
        let workflow = WorkflowCompiler::assemble(&graph, &pipeline.name, templates, &self.options.arguments)?;
        log::info!(
            "compiled pipeline '{}' into {} templates",
            pipeline.name,
            workflow.spec.templates.len()
        );
        Ok(workflow)
    }

    /// Compile a pipeline function into workflow YAML
    pub fn compile_to_yaml(&self, pipeline: &PipelineFn) -> Result<String> {
        let workflow = self.compile(pipeline)?;
        Ok(serde_yaml::to_string(&workflow)?)
    }

    fn check_arguments(&self, graph: &PipelineGraph) -> Result<()> {
        for name in self.options.arguments.keys() {
            if !graph.params.iter().any(|spec| &spec.name == name) {
                return Err(CompileError::InvalidPipeline(format!(
                    "pipeline '{}' has no parameter '{}'",
                    graph.name, name
                )));
            }
        }
        Ok(())
    }

    fn validate_ops(graph: &PipelineGraph) -> Result<()> {
        for op in graph.ops() {
            let result = match op {
                Operation::Container(container) => container.validate(),
                Operation::Resource(resource) => resource.validate(),
            };
            result.map_err(|e| CompileError::UnsupportedOperationShape(e.to_string()))?;
        }
        Ok(())
    }
}
