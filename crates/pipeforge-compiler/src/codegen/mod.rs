//! Code generation module
//!
//! This module contains the generators lowering a traced pipeline graph into
//! workflow templates and assembling the workflow document.

pub mod dag_codegen;
pub mod op_codegen;
pub mod workflow_codegen;

pub use dag_codegen::{DagTemplateCompiler, GroupAnalysis, ScopeIo};
pub use op_codegen::OpTemplateCompiler;
pub use workflow_codegen::WorkflowCompiler;
