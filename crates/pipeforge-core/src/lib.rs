//! PipeForge Core - Core types and definitions for the PipeForge pipeline compiler
//!
//! This crate provides the fundamental types used across the PipeForge workspace:
//! - Pipeline parameters and their placeholder text form
//! - Type descriptions used for type checking
//! - Operation model (container and resource steps) and resource objects
//! - Pipeline graph and scope model produced by tracing
//! - Component specifications
//! - Workflow manifest definitions
//! - Error types

pub mod component;
pub mod conf;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod naming;
pub mod ops;
pub mod param;
pub mod types;

// Re-export commonly used types
pub use component::ComponentSpec;
pub use conf::{ArtifactLocation, OpTransformer, PipelineConf};
pub use error::{CoreError, Result};
pub use graph::{Condition, Operand, PipelineGraph, Scope, ScopeId, ScopeKind, TaskHandle};
pub use manifest::{Template, Workflow};
pub use ops::{ContainerOp, OpAttributes, Operation, ResourceOp, VolumeOp};
pub use param::{ParamRef, ParamSpec, ParamTable, Parameter};
pub use types::TypeSpec;
