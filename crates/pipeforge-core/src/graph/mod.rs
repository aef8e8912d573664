//! Pipeline graph produced by tracing
//!
//! The graph owns every operation, the tree of scopes they live in, the
//! parameters known to the pipeline and the per-pipeline configuration.
//! Operations, scopes and the pipeline itself share a single name registry,
//! so every template name in the final workflow is unique.

pub mod scope;

pub use scope::{Condition, Operand, Scope, ScopeChild, ScopeId, ScopeKind};

use crate::conf::PipelineConf;
use crate::error::{CoreError, Result};
use crate::naming::{make_name_unique, sanitize_k8s_name};
use crate::ops::{OpAttributes, Operation};
use crate::param::{is_valid_param_name, ParamRef, ParamSpec, ParamTable, Parameter};
use std::collections::{BTreeMap, BTreeSet};

/// Handle to an operation added to the graph
#[derive(Debug, Clone, PartialEq)]
pub struct TaskHandle {
    /// Final operation name
    pub name: String,

    /// All outputs, implicit ones included
    pub outputs: Vec<Parameter>,

    /// Keys of the outputs declared by the user
    pub declared: Vec<String>,
}

impl TaskHandle {
    /// The only declared output
    pub fn output(&self) -> Result<Parameter> {
        match self.declared.as_slice() {
            [single] => self.output_named(single),
            _ => Err(CoreError::NoSuchOutput {
                task: self.name.clone(),
                output: "output".to_string(),
            }),
        }
    }

    pub fn output_named(&self, key: &str) -> Result<Parameter> {
        self.outputs
            .iter()
            .find(|p| p.name == key)
            .cloned()
            .ok_or_else(|| CoreError::NoSuchOutput {
                task: self.name.clone(),
                output: key.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineGraph {
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamSpec>,
    pub conf: PipelineConf,
    scopes: Vec<Scope>,
    ops: BTreeMap<String, Operation>,
    param_table: ParamTable,
    taken_names: BTreeSet<String>,
    scope_counter: usize,
}

impl PipelineGraph {
    /// Create a graph whose root scope is named after the sanitized pipeline name
    pub fn new(name: &str, description: Option<String>, params: Vec<ParamSpec>) -> Result<Self> {
        let root_name = sanitize_k8s_name(name);
        if root_name.is_empty() {
            return Err(CoreError::InvalidName(name.to_string()));
        }

        let mut graph = Self {
            name: root_name.clone(),
            description,
            params: Vec::new(),
            conf: PipelineConf::default(),
            scopes: vec![Scope {
                id: ScopeId::ROOT,
                name: root_name.clone(),
                kind: ScopeKind::Pipeline,
                parent: None,
                children: Vec::new(),
                inputs: Vec::new(),
                params: Vec::new(),
                dependent_names: Vec::new(),
            }],
            ops: BTreeMap::new(),
            param_table: ParamTable::new(),
            taken_names: BTreeSet::new(),
            scope_counter: 0,
        };
        graph.taken_names.insert(root_name);
        for spec in &params {
            graph.param_table.register(spec.parameter())?;
        }
        graph.params = params;
        Ok(graph)
    }

    /// Sanitize `human_name` and make it unique across ops and scopes
    pub fn reserve_name(&mut self, human_name: &str) -> Result<String> {
        let base = sanitize_k8s_name(human_name);
        if base.is_empty() {
            return Err(CoreError::InvalidName(human_name.to_string()));
        }
        let name = make_name_unique(&base, |candidate| self.taken_names.contains(candidate))
            .ok_or_else(|| CoreError::NameExhausted(base.clone()))?;
        self.taken_names.insert(name.clone());
        Ok(name)
    }

    /// Add an operation to `scope`, assigning its final name
    pub fn add_op(&mut self, scope: ScopeId, mut op: Operation) -> Result<TaskHandle> {
        self.check_scope(scope)?;
        let human_name = op.attrs().human_name.clone();
        if let Some(bad) = op.declared_output_keys().into_iter().find(|key| !is_valid_param_name(key)) {
            return Err(CoreError::InvalidParamName {
                step: human_name,
                name: bad,
            });
        }
        let name = self.reserve_name(&human_name)?;
        op.attrs_mut().name = name.clone();

        let outputs = op.outputs();
        for output in &outputs {
            self.param_table.register(output.clone())?;
        }
        let handle = TaskHandle {
            name: name.clone(),
            outputs,
            declared: op.declared_output_keys(),
        };

        log::debug!("added operation '{}' to scope {}", name, scope);
        self.scopes[scope.0].children.push(ScopeChild::Op(name.clone()));
        self.ops.insert(name, op);
        Ok(handle)
    }

    /// Add a nested scope named `<kind>-[<label>-]<n>`
    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind, inputs: Vec<Parameter>) -> Result<ScopeId> {
        self.check_scope(parent)?;
        self.scope_counter += 1;
        let label = match &kind {
            ScopeKind::Graph { function } => Some(function.clone()),
            ScopeKind::Recursion { target } => match &self.scope(*target)?.kind {
                ScopeKind::Graph { function } => Some(function.clone()),
                _ => None,
            },
            _ => None,
        };
        let raw = match label {
            Some(label) => format!("{}-{}-{}", kind.label(), label, self.scope_counter),
            None => format!("{}-{}", kind.label(), self.scope_counter),
        };
        let name = self.reserve_name(&raw.replace('_', "-"))?;

        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            inputs,
            params: Vec::new(),
            dependent_names: Vec::new(),
        });
        self.scopes[parent.0].children.push(ScopeChild::Scope(id));
        Ok(id)
    }

    fn check_scope(&self, id: ScopeId) -> Result<()> {
        if id.0 < self.scopes.len() {
            Ok(())
        } else {
            Err(CoreError::UnknownScope(id.0))
        }
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn scope(&self, id: ScopeId) -> Result<&Scope> {
        self.scopes.get(id.0).ok_or(CoreError::UnknownScope(id.0))
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope> {
        self.scopes.get_mut(id.0).ok_or(CoreError::UnknownScope(id.0))
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope_by_name(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    pub fn op(&self, name: &str) -> Option<&Operation> {
        self.ops.get(name)
    }

    /// Operations ordered by name
    pub fn ops(&self) -> impl Iterator<Item = &Operation> {
        self.ops.values()
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Replace every operation with `f(op)`; names are kept stable
    pub fn map_ops<F>(&mut self, mut f: F)
    where
        F: FnMut(Operation) -> Operation,
    {
        let ops = std::mem::take(&mut self.ops);
        self.ops = ops
            .into_iter()
            .map(|(name, op)| {
                let mut op = f(op);
                op.attrs_mut().name = name.clone();
                (name, op)
            })
            .collect();
    }

    /// Make `param` resolvable by placeholder; used for immediate values
    pub fn register_param(&mut self, param: Parameter) -> Result<()> {
        self.param_table.register(param)
    }

    pub fn lookup_param(&self, key: &ParamRef) -> Option<&Parameter> {
        self.param_table.get(key)
    }

    pub fn param_table(&self) -> &ParamTable {
        &self.param_table
    }

    /// Pipeline parameters in declaration order
    pub fn pipeline_params(&self) -> Vec<Parameter> {
        self.params.iter().map(ParamSpec::parameter).collect()
    }
}
