//! Manifest columns bound into runtime column configurations.

use sheetbind_spec::{ColumnSpec, ConstraintSpec, FieldMetadata, Manifest, ValueType};

use crate::config::{ColumnConfiguration, RawType};
use crate::constraint::{ColumnConstraint, PickList};
use crate::error::{BindingError, SheetBindError};
use crate::value::{EnumConstant, EnumDescriptor, TargetType};

/// Bound manifest along with its column configurations.
#[derive(Debug, Clone)]
pub struct ManifestBindings {
    manifest: Manifest,
    columns: Vec<ColumnConfiguration>,
}

impl ManifestBindings {
    /// Validate and bind a manifest. `locale` overrides the manifest's own
    /// locale when picking header titles.
    pub fn new(manifest: Manifest, locale: Option<&str>) -> Result<Self, SheetBindError> {
        let columns = bind_manifest(&manifest, locale)?;
        Ok(Self { manifest, columns })
    }

    /// Bind legacy field metadata; columns follow the array order.
    pub fn from_field_metadata(
        id: &str,
        fields: &[FieldMetadata],
        locale: Option<&str>,
    ) -> Result<Self, SheetBindError> {
        let manifest = sheetbind_spec::manifest_from_field_metadata(id, id, fields, locale);
        Self::new(manifest, None)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Column configurations in declaration order.
    pub fn columns(&self) -> &[ColumnConfiguration] {
        &self.columns
    }

    pub fn get(&self, key: &str) -> Option<&ColumnConfiguration> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Sheet named by the manifest, if any.
    pub fn sheet(&self) -> Option<&str> {
        self.manifest.manifest.sheet.as_deref()
    }

    pub fn into_parts(self) -> (Manifest, Vec<ColumnConfiguration>) {
        (self.manifest, self.columns)
    }
}

/// Validate `manifest` and bind every column.
pub fn bind_manifest(
    manifest: &Manifest,
    locale: Option<&str>,
) -> Result<Vec<ColumnConfiguration>, SheetBindError> {
    manifest.validate()?;
    let locale = locale.or(manifest.manifest.locale.as_deref());
    let columns = manifest
        .columns
        .iter()
        .map(|spec| bind_column(spec, locale))
        .collect::<Result<Vec<_>, _>>()?;
    #[cfg(feature = "tracing")]
    tracing::debug!(manifest = %manifest.manifest.id, columns = columns.len(), "manifest bound");
    Ok(columns)
}

/// Bind one column. Does not validate the surrounding manifest.
pub fn bind_column(
    spec: &ColumnSpec,
    locale: Option<&str>,
) -> Result<ColumnConfiguration, BindingError> {
    let index = spec.position().ok_or_else(|| BindingError::MissingPosition {
        key: spec.key.clone(),
    })?;

    let mut column = ColumnConfiguration::new(spec.key.clone(), index)
        .title(spec.title_for(locale))
        .writable(spec.writable);
    column.display = spec.display;
    column.label = spec.label.clone();
    column.length = spec.length;
    column.sample = spec.sample.clone();
    column.raw_type = spec.raw_type.as_deref().map(RawType::parse);
    column.target_type = spec.value_type.map(|t| target_type(spec, t)).transpose()?;
    if let Some(constraints) = &spec.constraints {
        column.constraints = bind_constraints(&spec.key, constraints)?;
    }
    Ok(column)
}

fn target_type(spec: &ColumnSpec, value_type: ValueType) -> Result<TargetType, BindingError> {
    Ok(match value_type {
        ValueType::String => TargetType::String,
        ValueType::Boolean => TargetType::Boolean,
        ValueType::Integer => TargetType::Int,
        ValueType::Long => TargetType::Long,
        ValueType::Float => TargetType::Float,
        ValueType::Double => TargetType::Double,
        ValueType::Decimal => TargetType::Decimal,
        ValueType::Date => TargetType::Date,
        ValueType::Datetime => TargetType::DateTime,
        ValueType::Time => TargetType::Time,
        ValueType::Enum => {
            let constants: Vec<EnumConstant> = spec
                .enum_values
                .iter()
                .flatten()
                .map(|v| EnumConstant {
                    name: v.name.clone(),
                    value: v.value.clone(),
                })
                .collect();
            if constants.is_empty() {
                return Err(BindingError::EmptyEnum(spec.key.clone()));
            }
            TargetType::enumeration(EnumDescriptor::new(spec.key.clone(), constants))
        }
    })
}

/// Constraints in evaluation order: presence first, then shape, then
/// membership, then uniqueness.
fn bind_constraints(
    key: &str,
    spec: &ConstraintSpec,
) -> Result<Vec<ColumnConstraint>, BindingError> {
    let mut out = Vec::new();
    if spec.required {
        out.push(ColumnConstraint::NotNull);
    }
    if let Some(max) = spec.max_length {
        out.push(ColumnConstraint::Length { max });
    }
    if spec.min.is_some() || spec.max.is_some() {
        out.push(ColumnConstraint::integer_range(spec.min, spec.max));
    }
    if spec.decimal_min.is_some() || spec.decimal_max.is_some() {
        out.push(ColumnConstraint::decimal_range(spec.decimal_min, spec.decimal_max));
    }
    if let Some(digits) = spec.precision {
        out.push(ColumnConstraint::FixedPrecision { digits });
    }
    if let Some(pattern) = &spec.pattern {
        let rule =
            ColumnConstraint::pattern(pattern).map_err(|source| BindingError::InvalidPattern {
                key: key.to_string(),
                source,
            })?;
        out.push(rule);
    }
    if let Some(list) = &spec.picklist {
        out.push(
            PickList::new(list.values.iter().cloned())
                .allow_multiple(list.allow_multiple)
                .must_be_in_range(list.must_be_in_range)
                .into(),
        );
    }
    if let Some(value) = &spec.fixed_value {
        out.push(ColumnConstraint::read_only(value.clone()));
    }
    if spec.unique {
        out.push(ColumnConstraint::Unique);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetbind_spec::{EnumValueSpec, PickListSpec};

    fn column(key: &str) -> ColumnSpec {
        ColumnSpec {
            key: key.to_string(),
            col: Some("C".to_string()),
            index: None,
            title: Some("Status".to_string()),
            titles: None,
            label: None,
            value_type: None,
            enum_values: None,
            raw_type: None,
            writable: true,
            display: true,
            length: None,
            sample: None,
            constraints: None,
        }
    }

    #[test]
    fn column_letter_becomes_index() {
        let bound = bind_column(&column("status"), None).unwrap();
        assert_eq!(bound.column_index, 2);
        assert_eq!(bound.title, "Status");
        assert!(bound.target_type.is_none());
    }

    #[test]
    fn constraints_keep_declaration_order() {
        let mut spec = column("code");
        spec.constraints = Some(ConstraintSpec {
            required: true,
            unique: true,
            max_length: Some(8),
            pattern: Some("[A-Z]+".to_string()),
            picklist: Some(PickListSpec {
                values: vec!["AB".to_string()],
                allow_multiple: false,
                must_be_in_range: true,
            }),
            ..ConstraintSpec::default()
        });
        let rules: Vec<_> = bind_column(&spec, None)
            .unwrap()
            .constraints
            .iter()
            .map(|c| c.rule())
            .collect();
        assert_eq!(rules, ["not_null", "length", "pattern", "picklist", "unique"]);
    }

    #[test]
    fn bad_pattern_names_the_column() {
        let mut spec = column("code");
        spec.constraints = Some(ConstraintSpec {
            pattern: Some("(".to_string()),
            ..ConstraintSpec::default()
        });
        let err = bind_column(&spec, None).unwrap_err();
        assert!(matches!(err, BindingError::InvalidPattern { ref key, .. } if key == "code"));
    }

    #[test]
    fn enum_column_carries_constants() {
        let mut spec = column("gender");
        spec.value_type = Some(ValueType::Enum);
        spec.enum_values = Some(vec![EnumValueSpec {
            name: "Male".to_string(),
            value: Some("M".to_string()),
        }]);
        let bound = bind_column(&spec, None).unwrap();
        match bound.target_type {
            Some(TargetType::Enum(descriptor)) => {
                assert_eq!(descriptor.resolve("m").map(|c| c.name.as_str()), Some("Male"));
            }
            other => panic!("unexpected target {other:?}"),
        }

        spec.enum_values = Some(Vec::new());
        assert!(matches!(
            bind_column(&spec, None),
            Err(BindingError::EmptyEnum(_))
        ));
    }

    #[test]
    fn missing_position_is_reported() {
        let mut spec = column("x");
        spec.col = None;
        assert!(matches!(
            bind_column(&spec, None),
            Err(BindingError::MissingPosition { .. })
        ));
    }
}
