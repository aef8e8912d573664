//! Workflow manifest data model
//!
//! Serializable structures mirroring the workflow engine's `Workflow`
//! resource. Empty optional sections are omitted on output.

pub mod template;
pub mod workflow;

pub use template::{
    Arguments, Artifact, Container, DagTask, DagTemplate, Inputs, OutputParameter, Outputs, ParameterDecl,
    ResourceTemplate, RetryStrategy, S3Artifact, Template, TemplateMetadata, ValueFrom,
};
pub use workflow::{Workflow, WorkflowMetadata, WorkflowSpec, PIPELINE_SPEC_ANNOTATION};
