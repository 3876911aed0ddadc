use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ColumnConfiguration;
use crate::constraint::{CheckedValue, UniqueTracker};
use crate::message::{DefaultCatalog, INVALID_CELL, INVALID_CELL_NUMBERED, INVALID_ROW, MessageCatalog};
use crate::record::RecordBinding;
use crate::value::TypedValue;

/// Where a cell error points: a zero-based column, or a record property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellLocator {
    Column(u32),
    Property(String),
}

impl fmt::Display for CellLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellLocator::Column(index) => write!(f, "column {}", index + 1),
            CellLocator::Property(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCellError {
    /// Zero-based row in the source.
    pub row_index: u32,
    pub locator: CellLocator,
    pub value: Option<TypedValue>,
    pub message: String,
    /// Name of the failed rule, e.g. `integer_range`.
    pub rule: &'static str,
}

impl InvalidCellError {
    pub fn row_number(&self) -> u32 {
        self.row_index + 1
    }

    /// One-based column number, when the error is column-addressed.
    pub fn column_number(&self) -> Option<u32> {
        match self.locator {
            CellLocator::Column(index) => Some(index + 1),
            CellLocator::Property(_) => None,
        }
    }

    pub fn property(&self) -> Option<&str> {
        match &self.locator {
            CellLocator::Property(path) => Some(path),
            CellLocator::Column(_) => None,
        }
    }

    fn from_violation(row_index: u32, violation: FieldViolation) -> Self {
        Self {
            row_index,
            locator: CellLocator::Property(violation.property_path),
            value: violation.value,
            message: violation.message,
            rule: "record",
        }
    }
}

impl fmt::Display for InvalidCellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InvalidCellError {}

/// The row that stopped a read pass, with the record as far as it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRowError<R> {
    pub row_index: u32,
    pub record: R,
    pub message: String,
    pub cell_errors: Vec<InvalidCellError>,
}

impl<R> InvalidRowError<R> {
    pub fn row_number(&self) -> u32 {
        self.row_index + 1
    }

    pub fn map_record<S>(self, f: impl FnOnce(R) -> S) -> InvalidRowError<S> {
        InvalidRowError {
            row_index: self.row_index,
            record: f(self.record),
            message: self.message,
            cell_errors: self.cell_errors,
        }
    }
}

impl<R> fmt::Display for InvalidRowError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cell in &self.cell_errors {
            write!(f, "\n  {cell}")?;
        }
        Ok(())
    }
}

impl<R: fmt::Debug> std::error::Error for InvalidRowError<R> {}

/// How a cell error message names its column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellAddressing {
    /// By column title.
    #[default]
    Title,
    /// By one-based column number.
    ColumnNumber,
}

/// Runs column constraints over one row at a time.
///
/// Holds the uniqueness state of a pass: call [`RowValidator::clear`] or
/// build a new validator before reusing it for another pass.
pub struct RowValidator {
    catalog: Arc<dyn MessageCatalog>,
    locale: Option<String>,
    addressing: CellAddressing,
    unique: UniqueTracker,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new(Arc::new(DefaultCatalog))
    }
}

impl RowValidator {
    pub fn new(catalog: Arc<dyn MessageCatalog>) -> Self {
        Self {
            catalog,
            locale: None,
            addressing: CellAddressing::default(),
            unique: UniqueTracker::new(),
        }
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_addressing(mut self, addressing: CellAddressing) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn clear(&mut self) {
        self.unique.clear();
    }

    /// Evaluate every constraint of every column; `values[i]` belongs to
    /// `columns[i]`. Errors come back in column then constraint order.
    pub fn validate_row(
        &mut self,
        row_index: u32,
        columns: &[ColumnConfiguration],
        values: &[CheckedValue<'_>],
    ) -> Vec<InvalidCellError> {
        let mut errors = Vec::new();
        for (column, value) in columns.iter().zip(values) {
            let text = value.converted().and_then(|v| column.enum_text(v));
            let value = match &text {
                Some(text) => CheckedValue::Value(text),
                None => *value,
            };
            for constraint in &column.constraints {
                if constraint.check(value, &column.key, &mut self.unique) {
                    continue;
                }
                let message = format!(
                    "{}{}",
                    self.cell_prefix(row_index, column),
                    self.catalog.render(
                        constraint.message_key(),
                        self.locale.as_deref(),
                        &constraint.message_args(),
                    )
                );
                errors.push(InvalidCellError {
                    row_index,
                    locator: CellLocator::Column(column.column_index),
                    value: value.subject().cloned(),
                    message,
                    rule: constraint.rule(),
                });
            }
        }
        errors
    }

    /// Key-value form: a missing key or `None` counts as a missing value.
    pub fn validate_map(
        &mut self,
        row_index: u32,
        record: &BTreeMap<String, Option<TypedValue>>,
        columns: &[ColumnConfiguration],
    ) -> Vec<InvalidCellError> {
        let values: Vec<CheckedValue<'_>> = columns
            .iter()
            .map(|c| checked(record.get(&c.key).and_then(Option::as_ref)))
            .collect();
        self.validate_row(row_index, columns, &values)
    }

    /// Sequence form: `record[i]` belongs to `columns[i]`.
    pub fn validate_list(
        &mut self,
        row_index: u32,
        record: &[Option<TypedValue>],
        columns: &[ColumnConfiguration],
    ) -> Vec<InvalidCellError> {
        let values: Vec<CheckedValue<'_>> = columns
            .iter()
            .enumerate()
            .map(|(i, _)| checked(record.get(i).and_then(Option::as_ref)))
            .collect();
        self.validate_row(row_index, columns, &values)
    }

    /// Wrap cell errors into the error that ends a pass.
    pub fn row_error<R>(
        &self,
        row_index: u32,
        record: R,
        cell_errors: Vec<InvalidCellError>,
    ) -> InvalidRowError<R> {
        let message = self.catalog.render(
            INVALID_ROW,
            self.locale.as_deref(),
            &[
                ("row", (row_index + 1).to_string()),
                ("count", cell_errors.len().to_string()),
            ],
        );
        InvalidRowError {
            row_index,
            record,
            message,
            cell_errors,
        }
    }

    fn cell_prefix(&self, row_index: u32, column: &ColumnConfiguration) -> String {
        let row = ("row", (row_index + 1).to_string());
        match self.addressing {
            CellAddressing::Title => self.catalog.render(
                INVALID_CELL,
                self.locale.as_deref(),
                &[row, ("title", column.title.clone())],
            ),
            CellAddressing::ColumnNumber => self.catalog.render(
                INVALID_CELL_NUMBERED,
                self.locale.as_deref(),
                &[row, ("column", (column.column_index + 1).to_string())],
            ),
        }
    }
}

fn checked(value: Option<&TypedValue>) -> CheckedValue<'_> {
    match value {
        Some(v) => CheckedValue::Value(v),
        None => CheckedValue::Missing,
    }
}

/// One property-addressed problem reported by a record validator.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub property_path: String,
    pub value: Option<TypedValue>,
    /// Final text; it is not interpolated further.
    pub message: String,
}

/// Structural validation of constructed typed records.
pub trait RecordValidator<T> {
    /// Called once before the first row of a pass.
    fn begin_pass(&mut self) {}

    fn validate(&mut self, row_index: u32, record: &T) -> Vec<FieldViolation>;
}

/// Re-express record violations as cell errors addressed by property path.
pub fn violations_to_cell_errors(
    row_index: u32,
    violations: Vec<FieldViolation>,
) -> Vec<InvalidCellError> {
    violations
        .into_iter()
        .map(|v| InvalidCellError::from_violation(row_index, v))
        .collect()
}

/// Runs the binding's column constraints through its field getters.
pub struct BindingConstraintValidator<T> {
    binding: Arc<RecordBinding<T>>,
    rows: RowValidator,
}

impl<T> BindingConstraintValidator<T> {
    pub fn new(binding: Arc<RecordBinding<T>>) -> Self {
        Self {
            binding,
            rows: RowValidator::default(),
        }
    }

    pub fn with_row_validator(mut self, rows: RowValidator) -> Self {
        self.rows = rows;
        self
    }
}

impl<T> RecordValidator<T> for BindingConstraintValidator<T> {
    fn begin_pass(&mut self) {
        self.rows.clear();
    }

    fn validate(&mut self, row_index: u32, record: &T) -> Vec<FieldViolation> {
        let columns = self.binding.columns();
        let values = self.binding.values(record);
        let checked: Vec<CheckedValue<'_>> = values.iter().map(|v| checked(v.as_ref())).collect();
        self.rows
            .validate_row(row_index, columns, &checked)
            .into_iter()
            .map(|error| {
                let property_path = match error.locator {
                    CellLocator::Column(index) => columns
                        .iter()
                        .find(|c| c.column_index == index)
                        .map(|c| c.key.clone())
                        .unwrap_or_else(|| index.to_string()),
                    CellLocator::Property(path) => path,
                };
                FieldViolation {
                    property_path,
                    value: error.value,
                    message: error.message,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ColumnConstraint, PickList};
    use crate::value::TargetType;

    fn columns() -> Vec<ColumnConfiguration> {
        vec![
            ColumnConfiguration::new("name", 0)
                .title("Name")
                .target(TargetType::String)
                .constraint(ColumnConstraint::NotNull)
                .constraint(ColumnConstraint::Length { max: 3 }),
            ColumnConfiguration::new("code", 1)
                .title("Code")
                .target(TargetType::String)
                .constraint(ColumnConstraint::from(PickList::new(["A", "B"])))
                .constraint(ColumnConstraint::Unique),
        ]
    }

    fn map(name: Option<&str>, code: Option<&str>) -> BTreeMap<String, Option<TypedValue>> {
        BTreeMap::from([
            ("name".to_string(), name.map(TypedValue::from)),
            ("code".to_string(), code.map(TypedValue::from)),
        ])
    }

    #[test]
    fn every_failed_rule_is_reported_in_order() {
        let mut validator = RowValidator::default();
        let errors = validator.validate_map(4, &map(Some("Alexander"), Some("C")), &columns());
        let rules: Vec<_> = errors.iter().map(|e| e.rule).collect();
        assert_eq!(rules, vec!["length", "picklist"]);
        assert_eq!(
            errors[0].message,
            "Row 5, column \"Name\": must be at most 3 characters"
        );
        assert_eq!(errors[1].message, "Row 5, column \"Code\": must be one of [\"A\",\"B\"]");
        assert_eq!(errors[1].column_number(), Some(2));
        assert_eq!(errors[1].value, Some(TypedValue::from("C")));
    }

    #[test]
    fn numbered_addressing_uses_one_based_columns() {
        let mut validator = RowValidator::default().with_addressing(CellAddressing::ColumnNumber);
        let errors = validator.validate_list(0, &[None, Some("A".into())], &columns());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Row 1, column 1: a value is required");
    }

    #[test]
    fn uniqueness_lasts_until_clear() {
        let mut validator = RowValidator::default();
        let cols = columns();
        assert!(validator.validate_map(0, &map(Some("a"), Some("A")), &cols).is_empty());
        let dup = validator.validate_map(1, &map(Some("b"), Some("A")), &cols);
        assert_eq!(dup.iter().map(|e| e.rule).collect::<Vec<_>>(), vec!["unique"]);
        validator.clear();
        assert!(validator.validate_map(2, &map(Some("c"), Some("A")), &cols).is_empty());
    }

    #[test]
    fn row_error_counts_cells() {
        let validator = RowValidator::default();
        let err = validator.row_error(2, (), Vec::new());
        assert_eq!(err.row_number(), 3);
        assert_eq!(err.message, "Row 3 has 0 invalid cell(s)");
    }

    #[test]
    fn violations_become_property_errors() {
        let errors = violations_to_cell_errors(
            1,
            vec![FieldViolation {
                property_path: "address.city".into(),
                value: None,
                message: "city is required".into(),
            }],
        );
        assert_eq!(errors[0].property(), Some("address.city"));
        assert_eq!(errors[0].column_number(), None);
        assert_eq!(errors[0].row_number(), 2);
    }
}
