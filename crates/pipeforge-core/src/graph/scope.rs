//! Scopes and conditions

use crate::param::{ParamSpec, Parameter};
use std::fmt;

/// Index of a scope in [`super::PipelineGraph`]; the root pipeline scope is `ScopeId::ROOT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Param(Parameter),
    Literal(String),
}

impl Operand {
    pub fn param(&self) -> Option<&Parameter> {
        match self {
            Operand::Param(p) => Some(p),
            Operand::Literal(_) => None,
        }
    }
}

impl From<&Parameter> for Operand {
    fn from(param: &Parameter) -> Self {
        Operand::Param(param.clone())
    }
}

impl From<Parameter> for Operand {
    fn from(param: Parameter) -> Self {
        Operand::Param(param)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Literal(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Literal(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Literal(value.to_string())
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(value.to_string())
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Literal(value.to_string())
    }
}

/// Binary comparison guarding a condition scope
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Operand,
    pub operator: String,
    pub rhs: Operand,
}

impl Condition {
    fn new(lhs: impl Into<Operand>, operator: &str, rhs: impl Into<Operand>) -> Self {
        Self {
            lhs: lhs.into(),
            operator: operator.to_string(),
            rhs: rhs.into(),
        }
    }

    pub fn eq(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, "==", rhs)
    }

    pub fn ne(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, "!=", rhs)
    }

    pub fn gt(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, ">", rhs)
    }

    pub fn ge(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, ">=", rhs)
    }

    pub fn lt(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, "<", rhs)
    }

    pub fn le(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(lhs, "<=", rhs)
    }

    /// Parameters used by either side, left first
    pub fn params(&self) -> Vec<&Parameter> {
        self.lhs.param().into_iter().chain(self.rhs.param()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    /// The pipeline itself
    Pipeline,

    /// Invocation of a nested pipeline function
    Graph { function: String },

    /// Body executed only when the condition holds
    Condition(Condition),

    /// Re-invocation of an enclosing graph scope
    Recursion { target: ScopeId },
}

impl ScopeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Pipeline => "pipeline",
            ScopeKind::Graph { .. } | ScopeKind::Recursion { .. } => "graph",
            ScopeKind::Condition(_) => "condition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeChild {
    Op(String),
    Scope(ScopeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,

    /// Operations and nested scopes in insertion order
    pub children: Vec<ScopeChild>,

    /// Arguments of a graph or recursion scope, positional
    pub inputs: Vec<Parameter>,

    /// Declared parameters of the function a graph scope invokes, matching `inputs`
    pub params: Vec<ParamSpec>,

    /// Explicit predecessors
    pub dependent_names: Vec<String>,
}

impl Scope {
    pub fn is_recursion(&self) -> bool {
        matches!(self.kind, ScopeKind::Recursion { .. })
    }

    pub fn recursion_target(&self) -> Option<ScopeId> {
        match self.kind {
            ScopeKind::Recursion { target } => Some(target),
            _ => None,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match &self.kind {
            ScopeKind::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    pub fn child_scopes(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.children.iter().filter_map(|c| match c {
            ScopeChild::Scope(id) => Some(*id),
            ScopeChild::Op(_) => None,
        })
    }

    pub fn child_ops(&self) -> impl Iterator<Item = &str> + '_ {
        self.children.iter().filter_map(|c| match c {
            ScopeChild::Op(name) => Some(name.as_str()),
            ScopeChild::Scope(_) => None,
        })
    }
}
