//! Legacy per-field metadata documents.
//!
//! Older integrations describe columns as a JSON array of field objects
//! (`api_Name`, `displayLabel`, `fieldtype`, ...). Each element becomes one
//! column, positioned by its array index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::manifest::{
    ColumnSpec, ConstraintSpec, Manifest, ManifestMeta, PickListSpec, SPEC_IDENT, SpecVersion,
    ValueType,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedLabel {
    pub locale: String,
    #[serde(rename = "labelName")]
    pub label_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldType {
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(rename = "picklistEntry", default)]
    pub picklist_entry: Option<String>,
    #[serde(default)]
    pub digits: Option<u32>,
    #[serde(default)]
    pub length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(rename = "api_Name")]
    pub api_name: String,
    #[serde(rename = "displayLabel", default)]
    pub display_label: Vec<LocalizedLabel>,
    #[serde(rename = "labelName", default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "isUnique", default)]
    pub is_unique: bool,
    #[serde(default)]
    pub sample: Option<JsonValue>,
    #[serde(default)]
    pub fieldtype: Option<FieldType>,
    #[serde(rename = "attachmentType", default)]
    pub attachment_type: Option<JsonValue>,
}

impl FieldMetadata {
    /// Parse a JSON array of field objects.
    pub fn parse_array(json: &str) -> Result<Vec<FieldMetadata>, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sample text for template rows: `"null"` means no sample.
    pub fn sample_text(&self) -> Option<String> {
        let raw = match self.sample.as_ref()? {
            JsonValue::Null => return None,
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        if raw.eq_ignore_ascii_case("null") {
            Some(String::new())
        } else {
            Some(format!("Sample: {raw}"))
        }
    }

    fn is_attachment(&self) -> bool {
        self.fieldtype.is_none()
            && self
                .attachment_type
                .as_ref()
                .is_some_and(|v| !v.is_null())
    }

    /// Convert into a column spec placed at `index`.
    pub fn to_column(&self, index: u32) -> ColumnSpec {
        let titles: BTreeMap<String, String> = self
            .display_label
            .iter()
            .map(|l| (l.locale.clone(), l.label_name.clone()))
            .collect();

        let mut constraints = ConstraintSpec {
            required: self.required,
            unique: self.is_unique,
            ..ConstraintSpec::default()
        };

        let (raw_type, value_type) = match &self.fieldtype {
            Some(ft) => {
                apply_field_type(ft, &mut constraints);
                (Some(ft.type_name.clone()), Some(value_type_for(&ft.type_name)))
            }
            None if self.is_attachment() => (Some("ATTACHMENT".to_string()), None),
            None => (None, None),
        };

        ColumnSpec {
            key: self.api_name.clone(),
            col: None,
            index: Some(index),
            title: self.label_name.clone(),
            titles: (!titles.is_empty()).then_some(titles),
            label: self.label_name.clone(),
            value_type,
            enum_values: None,
            raw_type,
            writable: self.input,
            display: true,
            length: None,
            sample: self.sample_text(),
            constraints: Some(constraints),
        }
    }
}

fn apply_field_type(ft: &FieldType, constraints: &mut ConstraintSpec) {
    let entries = || {
        ft.picklist_entry
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    match ft.type_name.to_ascii_lowercase().as_str() {
        "picklist" => {
            constraints.picklist = Some(PickListSpec {
                values: entries(),
                allow_multiple: false,
                must_be_in_range: true,
            })
        }
        "combobox" => {
            constraints.picklist = Some(PickListSpec {
                values: entries(),
                allow_multiple: false,
                must_be_in_range: false,
            })
        }
        "integer" | "int" => {
            constraints.min = Some(i32::MIN as i64);
            constraints.max = Some(i32::MAX as i64);
        }
        "double" => constraints.precision = Some(ft.digits.unwrap_or(0)),
        "string" => {
            constraints.max_length = ft.length.filter(|len| *len > 0);
        }
        _ => {}
    }
}

/// Target type implied by a legacy type name; unknown names read as text.
pub fn value_type_for(type_name: &str) -> ValueType {
    match type_name.to_ascii_lowercase().as_str() {
        "double" | "percent" => ValueType::Double,
        "int" | "integer" | "short" | "byte" => ValueType::Integer,
        "date" => ValueType::Date,
        "datetime" => ValueType::Datetime,
        "time" => ValueType::Time,
        "boolean" => ValueType::Boolean,
        _ => ValueType::String,
    }
}

/// Build a manifest whose columns follow the array order of `fields`.
pub fn manifest_from_field_metadata(
    id: &str,
    name: &str,
    fields: &[FieldMetadata],
    locale: Option<&str>,
) -> Manifest {
    Manifest {
        spec: SPEC_IDENT.to_string(),
        spec_version: SpecVersion::current(),
        manifest: ManifestMeta {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            tags: None,
            sheet: None,
            locale: locale.map(str::to_string),
            metadata: None,
        },
        columns: fields
            .iter()
            .enumerate()
            .map(|(idx, field)| field.to_column(idx as u32))
            .collect(),
    }
}
