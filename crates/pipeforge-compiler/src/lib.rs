//! PipeForge Compiler - pipeline function to workflow manifest compiler
//!
//! A pipeline function is traced into a graph of operations and scopes,
//! checked, and lowered into a workflow of container, resource and DAG
//! templates.

pub mod builder;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod semantic;
pub mod transform;

// Re-export main types
pub use builder::{trace, PipelineBuilder, PipelineFn};
pub use compiler::{Compiler, CompilerOptions};
pub use error::{CompileError, Result};
pub use transform::{add_pod_env, ADD_POD_ENV_LABEL};

// Re-export codegen and semantic types
pub use codegen::{DagTemplateCompiler, OpTemplateCompiler, WorkflowCompiler};
pub use semantic::{ReferenceResolver, TypeChecker};
