//! Per-column validation rules.
//!
//! Every rule except [`ColumnConstraint::Unique`] is a pure predicate over a
//! coerced value. Uniqueness needs memory of the values already seen in a
//! pass; that state lives in a [`UniqueTracker`] owned by the validator of the
//! pass, so constraint lists stay immutable and shareable.

use regex::Regex;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::value::TypedValue;

/// What the validator sees for one column of one row.
#[derive(Debug, Clone, Copy)]
pub enum CheckedValue<'a> {
    /// The cell coerced to the column's target type.
    Value(&'a TypedValue),
    /// Blank cell, error cell, or a column not read.
    Missing,
    /// Non-blank cell whose coercion produced nothing; carries the raw value.
    Unconverted(&'a TypedValue),
}

impl<'a> CheckedValue<'a> {
    /// The value rules other than not-null are evaluated against.
    pub fn subject(&self) -> Option<&'a TypedValue> {
        match *self {
            CheckedValue::Value(v) | CheckedValue::Unconverted(v) => Some(v),
            CheckedValue::Missing => None,
        }
    }

    pub fn converted(&self) -> Option<&'a TypedValue> {
        match *self {
            CheckedValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A regular expression that must match the whole value.
#[derive(Debug, Clone)]
pub struct PatternRule {
    source: String,
    regex: Regex,
}

impl PatternRule {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Enumerated permitted values.
#[derive(Debug, Clone, PartialEq)]
pub struct PickList {
    pub values: Vec<String>,
    /// Comma-separated input, each token matched ignoring case.
    pub allow_multiple: bool,
    /// When false the list only drives input hints and never fails.
    pub must_be_in_range: bool,
}

impl PickList {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            allow_multiple: false,
            must_be_in_range: true,
        }
    }

    pub fn allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    pub fn must_be_in_range(mut self, strict: bool) -> Self {
        self.must_be_in_range = strict;
        self
    }

    pub fn accepts(&self, text: &str) -> bool {
        if !self.must_be_in_range {
            return true;
        }
        if self.allow_multiple {
            text.split(',').map(str::trim).all(|token| {
                let token = token.to_lowercase();
                self.values.iter().any(|v| v.to_lowercase() == token)
            })
        } else {
            self.values.iter().any(|v| v == text)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ColumnConstraint {
    NotNull,
    Length { max: usize },
    /// Inclusive; text input is parsed as a decimal and truncated first.
    IntegerRange { min: i64, max: i64 },
    DecimalRange { min: f64, max: f64 },
    /// Fractional digits past `digits` must be zero.
    FixedPrecision { digits: u32 },
    Pattern(PatternRule),
    PickList(PickList),
    ReadOnly { value: String },
    Unique,
}

impl From<PickList> for ColumnConstraint {
    fn from(list: PickList) -> Self {
        ColumnConstraint::PickList(list)
    }
}

impl ColumnConstraint {
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        PatternRule::new(source).map(ColumnConstraint::Pattern)
    }

    /// Missing bounds default to the 32-bit integer range.
    pub fn integer_range(min: Option<i64>, max: Option<i64>) -> Self {
        ColumnConstraint::IntegerRange {
            min: min.unwrap_or(i32::MIN as i64),
            max: max.unwrap_or(i32::MAX as i64),
        }
    }

    pub fn decimal_range(min: Option<f64>, max: Option<f64>) -> Self {
        ColumnConstraint::DecimalRange {
            min: min.unwrap_or(f64::MIN),
            max: max.unwrap_or(f64::MAX),
        }
    }

    pub fn read_only(value: impl Into<String>) -> Self {
        ColumnConstraint::ReadOnly {
            value: value.into(),
        }
    }

    /// Short rule name carried by cell errors.
    pub fn rule(&self) -> &'static str {
        match self {
            ColumnConstraint::NotNull => "not_null",
            ColumnConstraint::Length { .. } => "length",
            ColumnConstraint::IntegerRange { .. } => "integer_range",
            ColumnConstraint::DecimalRange { .. } => "decimal_range",
            ColumnConstraint::FixedPrecision { .. } => "fixed_precision",
            ColumnConstraint::Pattern(_) => "pattern",
            ColumnConstraint::PickList(_) => "picklist",
            ColumnConstraint::ReadOnly { .. } => "readonly",
            ColumnConstraint::Unique => "unique",
        }
    }

    /// Catalog key of the rule-specific message suffix.
    pub fn message_key(&self) -> &'static str {
        match self {
            ColumnConstraint::NotNull => "validation.notnull",
            ColumnConstraint::Length { .. } => "validation.length",
            ColumnConstraint::IntegerRange { .. } => "validation.integer_range",
            ColumnConstraint::DecimalRange { .. } => "validation.decimal_range",
            ColumnConstraint::FixedPrecision { .. } => "validation.fixed_precision",
            ColumnConstraint::Pattern(_) => "validation.pattern",
            ColumnConstraint::PickList(_) => "validation.picklist",
            ColumnConstraint::ReadOnly { .. } => "validation.readonly",
            ColumnConstraint::Unique => "validation.unique",
        }
    }

    /// Placeholder values substituted into the rule's message template.
    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            ColumnConstraint::Length { max } => vec![("length", max.to_string())],
            ColumnConstraint::IntegerRange { min, max } => {
                vec![("min", min.to_string()), ("max", max.to_string())]
            }
            ColumnConstraint::DecimalRange { min, max } => {
                vec![("min", min.to_string()), ("max", max.to_string())]
            }
            ColumnConstraint::FixedPrecision { digits } => vec![("digits", digits.to_string())],
            ColumnConstraint::Pattern(rule) => vec![("pattern", rule.source().to_string())],
            ColumnConstraint::PickList(list) => vec![(
                "range",
                serde_json::to_string(&list.values).unwrap_or_default(),
            )],
            ColumnConstraint::ReadOnly { value } => vec![("value", value.clone())],
            ColumnConstraint::NotNull | ColumnConstraint::Unique => Vec::new(),
        }
    }

    /// Stateless predicate. A missing value only fails `NotNull`; `Unique`
    /// always passes here and is checked through a [`UniqueTracker`].
    pub fn is_valid(&self, value: Option<&TypedValue>) -> bool {
        let Some(value) = value else {
            return !matches!(self, ColumnConstraint::NotNull);
        };
        match self {
            ColumnConstraint::NotNull => !matches!(value, TypedValue::String(s) if s.is_empty()),
            ColumnConstraint::Length { max } => value.to_string().chars().count() <= *max,
            ColumnConstraint::IntegerRange { min, max } => match value.as_f64() {
                Some(n) if n.is_finite() => {
                    let n = n.trunc();
                    n >= *min as f64 && n <= *max as f64
                }
                _ => false,
            },
            ColumnConstraint::DecimalRange { min, max } => match value.as_f64() {
                Some(n) if n.is_finite() => n >= *min && n <= *max,
                _ => false,
            },
            ColumnConstraint::FixedPrecision { digits } => precision_within(value, *digits),
            ColumnConstraint::Pattern(rule) => rule.is_match(&value.to_string()),
            ColumnConstraint::PickList(list) => list.accepts(&value.to_string()),
            ColumnConstraint::ReadOnly { value: fixed } => value.to_string() == *fixed,
            ColumnConstraint::Unique => true,
        }
    }

    /// Evaluate against what a row produced for the column.
    ///
    /// `NotNull` fails when the cell did not convert; the other rules judge
    /// the raw value in that case so the offending input is still checked.
    pub fn check(
        &self,
        value: CheckedValue<'_>,
        column: &str,
        unique: &mut UniqueTracker,
    ) -> bool {
        match self {
            ColumnConstraint::NotNull => self.is_valid(value.converted()),
            ColumnConstraint::Unique => match value.converted() {
                Some(v) => unique.check(column, v),
                None => true,
            },
            _ => self.is_valid(value.subject()),
        }
    }
}

fn precision_within(value: &TypedValue, digits: u32) -> bool {
    match value {
        TypedValue::Int(_) | TypedValue::Long(_) => true,
        TypedValue::Decimal(d) => d.normalize().scale() <= digits,
        TypedValue::Money(m) => m.amount.normalize().scale() <= digits,
        TypedValue::Float(_) | TypedValue::Double(_) | TypedValue::String(_) => {
            fractional_digits_within(&value.to_string(), digits)
        }
        _ => false,
    }
}

fn fractional_digits_within(text: &str, digits: u32) -> bool {
    let text = text.trim();
    if text.contains(['e', 'E']) {
        return Decimal::from_scientific(text)
            .map(|d| d.normalize().scale() <= digits)
            .unwrap_or(false);
    }
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return false;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }
    fraction.chars().skip(digits as usize).all(|c| c == '0')
}

/// Values already seen per column within one pass.
#[derive(Debug, Default)]
pub struct UniqueTracker {
    seen: FxHashMap<String, FxHashSet<TypedValue>>,
}

impl UniqueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on the first occurrence of `value` in `column`, false afterwards.
    pub fn check(&mut self, column: &str, value: &TypedValue) -> bool {
        match self.seen.get_mut(column) {
            Some(values) => values.insert(value.clone()),
            None => {
                let mut values = FxHashSet::default();
                values.insert(value.clone());
                self.seen.insert(column.to_string(), values);
                true
            }
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.seen.values().all(|v| v.is_empty())
    }
}
