//! Declarative column manifests for sheetbind.
//!
//! A [`Manifest`] lists the columns of one tabular layout: where each column
//! sits, what it is called, which type its cells coerce to, and which rules a
//! value must satisfy. Manifests are plain YAML/JSON documents validated by
//! [`Manifest::validate`]; the `sheetbind` crate turns them into runtime
//! column configurations.

pub mod field_metadata;
pub mod manifest;
pub mod validation;

pub use field_metadata::{FieldMetadata, FieldType, LocalizedLabel, manifest_from_field_metadata};
pub use manifest::{
    CURRENT_SPEC_VERSION, ColumnSpec, ConstraintSpec, EnumValueSpec, Manifest, ManifestMeta,
    PickListSpec, SPEC_IDENT, SpecVersion, ValueType,
};
pub use validation::{ManifestIssue, ValidationError};

/// JSON Schema for [`Manifest`] as a `serde_json::Value`.
pub fn generate_schema_value() -> serde_json::Value {
    let schema = schemars::schema_for!(Manifest);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}

/// Pretty-printed JSON Schema for [`Manifest`].
pub fn generate_schema_json_pretty() -> String {
    serde_json::to_string_pretty(&generate_schema_value()).unwrap_or_default()
}
