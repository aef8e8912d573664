//! Type descriptions for pipeline parameters
//!
//! This module contains:
//! - The `TypeSpec` description carried by parameters and component inputs
//! - Builtin type constructors

pub mod builtin;
pub mod spec;

pub use spec::TypeSpec;
