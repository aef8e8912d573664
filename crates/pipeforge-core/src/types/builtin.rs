//! Builtin type constructors

use super::TypeSpec;
use serde_json::{json, Value};

pub fn integer() -> TypeSpec {
    TypeSpec::named("Integer")
}

pub fn float() -> TypeSpec {
    TypeSpec::named("Float")
}

pub fn string() -> TypeSpec {
    TypeSpec::named("String")
}

pub fn bool() -> TypeSpec {
    TypeSpec::named("Bool")
}

pub fn list() -> TypeSpec {
    TypeSpec::named("List")
}

pub fn dict() -> TypeSpec {
    TypeSpec::named("Dict")
}

/// Cloud storage path; `file_type` becomes a property when given
pub fn gcs_path(file_type: Option<&str>) -> TypeSpec {
    match file_type {
        Some(ft) => TypeSpec::with_properties("GCSPath", [("file_type", Value::from(ft))]),
        None => TypeSpec::named("GCSPath"),
    }
}

/// Container registry path, validated by pattern
pub fn gcr_path() -> TypeSpec {
    TypeSpec::schema(
        "GCRPath",
        json!({"type": "string", "pattern": "^.*gcr\\.io/.*$"}),
    )
}

pub fn gcp_project_id() -> TypeSpec {
    TypeSpec::schema("GCPProjectID", json!({"type": "string"}))
}

pub fn gcp_region() -> TypeSpec {
    TypeSpec::schema("GCPRegion", json!({"type": "string"}))
}
