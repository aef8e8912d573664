//! PipeForge SDK
//!
//! High-level API for compiling pipelines and packaging the resulting
//! workflow manifests.

pub mod builder;
pub mod config;
pub mod emitter;
pub mod error;
pub mod pipeline_sdk;

// Re-export main types
pub use builder::PipelineSdkBuilder;
pub use config::SdkConfig;
pub use emitter::{ManifestEmitter, OutputFormat, ARCHIVE_ENTRY};
pub use error::{Result, SdkError};
pub use pipeline_sdk::PipelineSdk;

// Re-export commonly used types from dependencies
pub use pipeforge_compiler::{PipelineBuilder, PipelineFn};
pub use pipeforge_core::{ArtifactLocation, Condition, ContainerOp, OpAttributes, ParamSpec, ResourceOp, Workflow};
