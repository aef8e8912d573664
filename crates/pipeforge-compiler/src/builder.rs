//! Pipeline tracing
//!
//! A pipeline is a function over its parameters. Compiling it runs the
//! function once against a [`PipelineBuilder`], which records every
//! operation, nested pipeline call, condition and recursive call into a
//! [`PipelineGraph`]. Nothing is executed: parameters are placeholders and
//! operations only describe the steps.

use crate::error::{CompileError, Result};
use pipeforge_core::graph::{Condition, ScopeId, ScopeKind, TaskHandle};
use pipeforge_core::naming::sanitize_k8s_name;
use pipeforge_core::{CoreError, Operation, ParamSpec, Parameter, PipelineConf, PipelineGraph};
use std::fmt;
use std::sync::Arc;

/// Body of a pipeline function
pub type PipelineBody = Arc<dyn Fn(&mut PipelineBuilder, &[Parameter]) -> Result<()> + Send + Sync>;

/// A named, parameterized pipeline definition
#[derive(Clone)]
pub struct PipelineFn {
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamSpec>,
    body: PipelineBody,
}

impl PipelineFn {
    pub fn new<F>(name: impl Into<String>, params: Vec<ParamSpec>, body: F) -> Self
    where
        F: Fn(&mut PipelineBuilder, &[Parameter]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            params,
            body: Arc::new(body),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Loop running `body` at least once, then again while `condition` holds.
    ///
    /// `body` returns the arguments of the next iteration. The loop is meant
    /// to be invoked from another pipeline with [`PipelineBuilder::call`].
    pub fn do_while<B, C>(name: impl Into<String>, params: Vec<ParamSpec>, body: B, condition: C) -> Self
    where
        B: Fn(&mut PipelineBuilder, &[Parameter]) -> Result<Vec<Parameter>> + Send + Sync + 'static,
        C: Fn(&[Parameter]) -> Condition + Send + Sync + 'static,
    {
        Self::new(name, params, move |b, args| {
            let next = body(b, args)?;
            b.condition(condition(&next), |b| b.recurse(&next).map(|_| ()))?;
            Ok(())
        })
    }

    /// Loop running `body` while `condition` holds, possibly never
    pub fn while_loop<C, B>(name: impl Into<String>, params: Vec<ParamSpec>, condition: C, body: B) -> Self
    where
        C: Fn(&[Parameter]) -> Condition + Send + Sync + 'static,
        B: Fn(&mut PipelineBuilder, &[Parameter]) -> Result<Vec<Parameter>> + Send + Sync + 'static,
    {
        Self::new(name, params, move |b, args| {
            b.condition(condition(args), |b| {
                let next = body(b, args)?;
                b.recurse(&next).map(|_| ())
            })?;
            Ok(())
        })
    }

    pub(crate) fn invoke(&self, builder: &mut PipelineBuilder, args: &[Parameter]) -> Result<()> {
        (self.body)(builder, args)
    }
}

impl fmt::Debug for PipelineFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineFn")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish()
    }
}

/// Records the pipeline graph while a pipeline function runs
pub struct PipelineBuilder {
    graph: PipelineGraph,
    scope_stack: Vec<ScopeId>,
    /// Active nested pipeline calls: function name and its graph scope
    call_stack: Vec<(String, ScopeId)>,
}

impl PipelineBuilder {
    pub(crate) fn new(graph: PipelineGraph) -> Self {
        Self {
            graph,
            scope_stack: vec![ScopeId::ROOT],
            call_stack: Vec::new(),
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.scope_stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    /// Add an operation to the current scope
    pub fn add(&mut self, op: impl Into<Operation>) -> Result<TaskHandle> {
        let scope = self.current_scope();
        Ok(self.graph.add_op(scope, op.into())?)
    }

    /// Declare a parameter with an immediate value.
    ///
    /// The name is sanitized like a pipeline parameter name and must not be
    /// taken by a pipeline parameter or by a constant with another value.
    pub fn constant(&mut self, name: &str, value: impl Into<String>) -> Result<Parameter> {
        let sanitized = sanitize_k8s_name(name);
        if sanitized.is_empty() {
            return Err(CoreError::InvalidName(name.to_string()).into());
        }
        let param = Parameter::new(sanitized).with_value(value);
        self.graph.register_param(param.clone())?;
        Ok(param)
    }

    /// Run `body` inside a scope guarded by `condition`
    pub fn condition<F>(&mut self, condition: Condition, body: F) -> Result<ScopeId>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let parent = self.current_scope();
        let id = self.graph.add_scope(parent, ScopeKind::Condition(condition), Vec::new())?;
        self.scope_stack.push(id);
        let result = body(self);
        self.scope_stack.pop();
        result.map(|_| id)
    }

    /// Invoke a nested pipeline.
    ///
    /// Calling a function that is already active produces a recursion
    /// scope pointing back at the active call instead of tracing it again.
    pub fn call(&mut self, function: &PipelineFn, args: &[Parameter]) -> Result<ScopeId> {
        if args.len() != function.params.len() {
            return Err(CompileError::InvalidPipeline(format!(
                "'{}' takes {} arguments but {} were given",
                function.name,
                function.params.len(),
                args.len()
            )));
        }

        let active = self
            .call_stack
            .iter()
            .rev()
            .find(|(name, _)| *name == function.name)
            .map(|(_, id)| *id);
        if let Some(target) = active {
            return self.recursion(target, args);
        }

        let parent = self.current_scope();
        let id = self.graph.add_scope(
            parent,
            ScopeKind::Graph {
                function: function.name.clone(),
            },
            args.to_vec(),
        )?;
        self.graph.scope_mut(id)?.params = function.params.clone();
        log::debug!("tracing nested pipeline '{}' as {}", function.name, id);

        self.scope_stack.push(id);
        self.call_stack.push((function.name.clone(), id));
        let result = function.invoke(self, args);
        self.call_stack.pop();
        self.scope_stack.pop();
        result.map(|_| id)
    }

    /// Re-invoke the innermost active nested pipeline with new arguments
    pub fn recurse(&mut self, args: &[Parameter]) -> Result<ScopeId> {
        let target = self
            .call_stack
            .last()
            .map(|(_, id)| *id)
            .ok_or_else(|| CompileError::InvalidPipeline("recursion outside of a nested pipeline".to_string()))?;
        self.recursion(target, args)
    }

    fn recursion(&mut self, target: ScopeId, args: &[Parameter]) -> Result<ScopeId> {
        let expected = self.graph.scope(target)?.inputs.len();
        if args.len() != expected {
            return Err(CompileError::InvalidPipeline(format!(
                "recursive call takes {} arguments but {} were given",
                expected,
                args.len()
            )));
        }
        let parent = self.current_scope();
        Ok(self
            .graph
            .add_scope(parent, ScopeKind::Recursion { target }, args.to_vec())?)
    }

    /// Make a scope run after `task`
    pub fn after(&mut self, scope: ScopeId, task: &TaskHandle) -> Result<()> {
        let scope = self.graph.scope_mut(scope)?;
        if !scope.dependent_names.contains(&task.name) {
            scope.dependent_names.push(task.name.clone());
        }
        Ok(())
    }

    /// Workflow-level settings of the pipeline being traced
    pub fn conf_mut(&mut self) -> &mut PipelineConf {
        &mut self.graph.conf
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub(crate) fn finish(self) -> PipelineGraph {
        self.graph
    }
}

/// Trace `pipeline` into a graph
pub fn trace(pipeline: &PipelineFn) -> Result<PipelineGraph> {
    let graph = PipelineGraph::new(&pipeline.name, pipeline.description.clone(), pipeline.params.clone())?;
    let args = graph.pipeline_params();
    let mut builder = PipelineBuilder::new(graph);
    pipeline.invoke(&mut builder, &args)?;
    Ok(builder.finish())
}
