//! Conversion between raw cells and typed values.
//!
//! Reads never fail: a cell that cannot become the target type yields `None`
//! and is left for the constraints to judge. Writes never fail either; a
//! value a numeric cell cannot hold leaves the cell blank and reports why.

use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sheetbind_common::{CellKind, CellValue, DateSystem, fixed_number_format, format_number_fixed};
use sheetbind_io::{CellData, CellFormat, HorizontalAlign};

use crate::config::RawType;
use crate::datetime::DateTimeCodec;
use crate::value::{TargetType, TypedValue};

/// Serials outside this range do not name a representable calendar date.
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

const TEXT_FORMAT: &str = "@";
const PERCENT_FORMAT: &str = "0.00%";
const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const TIME_FORMAT: &str = "hh:mm:ss";

/// A typed value rendered for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    /// `None` leaves the cell blank.
    pub value: Option<CellValue>,
    pub format: CellFormat,
    /// Set when the value could not be shaped for the column's raw type.
    pub failure: Option<String>,
}

impl RenderedCell {
    fn new(value: Option<CellValue>, format: CellFormat) -> Self {
        Self {
            value,
            format,
            failure: None,
        }
    }

    fn failed(format: CellFormat, reason: String) -> Self {
        Self {
            value: None,
            format,
            failure: Some(reason),
        }
    }
}

pub struct Coercer<'a> {
    codec: &'a dyn DateTimeCodec,
    date_system: DateSystem,
}

impl<'a> Coercer<'a> {
    pub fn new(codec: &'a dyn DateTimeCodec) -> Self {
        Self {
            codec,
            date_system: DateSystem::default(),
        }
    }

    pub fn with_date_system(mut self, date_system: DateSystem) -> Self {
        self.date_system = date_system;
        self
    }

    /// Coerce a cell to `target`. Blank and error cells are always `None`.
    pub fn read_value(&self, cell: &CellData, target: &TargetType) -> Option<TypedValue> {
        match cell.kind() {
            CellKind::Blank | CellKind::Error => None,
            CellKind::Formula => formula_text(cell).map(TypedValue::String),
            CellKind::Boolean => {
                let flag = matches!(cell.value, Some(CellValue::Boolean(true)));
                Some(match target {
                    TargetType::Boolean => TypedValue::Boolean(flag),
                    _ => TypedValue::String(flag.to_string()),
                })
            }
            CellKind::Numeric => self.read_numeric(cell.value.as_ref()?, target),
            CellKind::Text => match &cell.value {
                Some(CellValue::Text(text)) => self.read_text(text, target),
                _ => None,
            },
        }
    }

    /// The cell's value without coercion: numbers as doubles, text, booleans
    /// and formula text.
    pub fn read_raw(&self, cell: &CellData) -> Option<TypedValue> {
        match cell.kind() {
            CellKind::Blank | CellKind::Error => None,
            CellKind::Formula => formula_text(cell).map(TypedValue::String),
            CellKind::Boolean => match cell.value {
                Some(CellValue::Boolean(b)) => Some(TypedValue::Boolean(b)),
                _ => None,
            },
            CellKind::Numeric => cell
                .value
                .as_ref()?
                .as_serial_number_in(self.date_system)
                .map(TypedValue::Double),
            CellKind::Text => match &cell.value {
                Some(CellValue::Text(text)) => Some(TypedValue::String(text.clone())),
                _ => None,
            },
        }
    }

    fn read_numeric(&self, value: &CellValue, target: &TargetType) -> Option<TypedValue> {
        let serial = value.as_serial_number_in(self.date_system)?;
        match target {
            TargetType::Time => self.datetime_of(value, serial).map(|dt| TypedValue::Time(dt.time())),
            TargetType::Date => self.datetime_of(value, serial).map(|dt| TypedValue::Date(dt.date())),
            TargetType::DateTime => self.datetime_of(value, serial).map(TypedValue::DateTime),
            TargetType::String => Some(TypedValue::String(format_number_fixed(serial))),
            TargetType::Enum(descriptor) => descriptor
                .resolve(&format_number_fixed(serial))
                .map(|c| TypedValue::Enum(c.name.clone())),
            _ => narrow(serial, target),
        }
    }

    fn datetime_of(&self, value: &CellValue, serial: f64) -> Option<NaiveDateTime> {
        match value {
            CellValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            CellValue::DateTime(dt) => Some(*dt),
            _ if (0.0..MAX_DATE_SERIAL).contains(&serial) => {
                Some(self.date_system.serial_to_datetime(serial))
            }
            _ => None,
        }
    }

    fn read_text(&self, text: &str, target: &TargetType) -> Option<TypedValue> {
        match target {
            TargetType::String => Some(TypedValue::String(text.to_string())),
            TargetType::Boolean => {
                let text = text.trim();
                Some(TypedValue::Boolean(
                    text.eq_ignore_ascii_case("yes") || text.eq_ignore_ascii_case("true"),
                ))
            }
            TargetType::Date => self.codec.parse_date(text).map(TypedValue::Date),
            TargetType::DateTime => self.codec.parse_datetime(text).map(TypedValue::DateTime),
            TargetType::Time => self.codec.parse_time(text).map(TypedValue::Time),
            TargetType::Enum(descriptor) => descriptor
                .resolve(text)
                .map(|c| TypedValue::Enum(c.name.clone())),
            TargetType::Decimal => parse_decimal(text.trim())
                .map(TypedValue::Decimal)
                .or_else(|| text.trim().parse::<f64>().ok().and_then(|n| narrow(n, target))),
            TargetType::Int | TargetType::Long => match text.trim().parse::<f64>() {
                Ok(n) => narrow(n, target),
                Err(_) => parse_hex(text.trim()).and_then(|n| narrow(n as f64, target)),
            },
            TargetType::Float | TargetType::Double => {
                text.trim().parse::<f64>().ok().and_then(|n| narrow(n, target))
            }
        }
    }

    /// Shape `value` for a column with the given raw type. `digits` is the
    /// decimal-place count used by `DOUBLE` cells.
    pub fn write_value(
        &self,
        value: Option<&TypedValue>,
        raw_type: Option<RawType>,
        digits: u32,
    ) -> RenderedCell {
        let Some(raw_type) = raw_type else {
            return self.write_untyped(value);
        };
        match raw_type {
            RawType::Integer => {
                let format =
                    CellFormat::aligned(HorizontalAlign::Right).with_number_format("0");
                match value {
                    None => RenderedCell::new(None, format),
                    Some(v) => match integer_of(v) {
                        Some(i) => RenderedCell::new(Some(CellValue::Int(i)), format),
                        None => RenderedCell::failed(format, format!("`{v}` is not an integer")),
                    },
                }
            }
            RawType::Double => {
                let mut number_format = fixed_number_format(digits);
                if let Some(TypedValue::Money(money)) = value {
                    number_format.push_str(&format!("\"({})\"", money.currency));
                }
                let format =
                    CellFormat::aligned(HorizontalAlign::Right).with_number_format(number_format);
                match value {
                    None => RenderedCell::new(None, format),
                    Some(v) => match v.as_f64() {
                        Some(n) => RenderedCell::new(Some(CellValue::Number(n)), format),
                        None => RenderedCell::failed(format, format!("`{v}` is not a number")),
                    },
                }
            }
            RawType::Percent => {
                let format = CellFormat::aligned(HorizontalAlign::Center)
                    .with_number_format(PERCENT_FORMAT);
                let cell = value.map(|v| match v {
                    TypedValue::String(s) => CellValue::Text(s.clone()),
                    other => other
                        .as_f64()
                        .map(CellValue::Number)
                        .unwrap_or_else(|| CellValue::Text(other.to_string())),
                });
                RenderedCell::new(cell, format)
            }
            RawType::Date => RenderedCell::new(
                value.map(|v| CellValue::Text(self.date_text(v))),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(DATE_FORMAT),
            ),
            RawType::DateTime => RenderedCell::new(
                value.map(|v| CellValue::Text(self.datetime_text(v))),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(DATETIME_FORMAT),
            ),
            RawType::Time => RenderedCell::new(
                value.map(|v| CellValue::Text(self.time_text(v))),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(TIME_FORMAT),
            ),
            RawType::Boolean => RenderedCell::new(
                value.map(|v| match v {
                    TypedValue::Boolean(b) => CellValue::Boolean(*b),
                    other => CellValue::Text(other.to_string()),
                }),
                CellFormat::aligned(HorizontalAlign::Center),
            ),
            RawType::PickList | RawType::ComboBox => RenderedCell::new(
                value.map(|v| CellValue::Text(v.to_string())),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(TEXT_FORMAT),
            ),
            RawType::String | RawType::TextArea | RawType::Attachment => RenderedCell::new(
                value.map(|v| CellValue::Text(v.to_string())),
                CellFormat::default().with_number_format(TEXT_FORMAT),
            ),
        }
    }

    /// No raw type: the value's own kind picks the cell shape.
    fn write_untyped(&self, value: Option<&TypedValue>) -> RenderedCell {
        let Some(value) = value else {
            return RenderedCell::new(None, CellFormat::default());
        };
        match value {
            TypedValue::Int(i) => RenderedCell::new(
                Some(CellValue::Int(*i as i64)),
                CellFormat::aligned(HorizontalAlign::Right),
            ),
            TypedValue::Long(l) => RenderedCell::new(
                Some(CellValue::Int(*l)),
                CellFormat::aligned(HorizontalAlign::Right),
            ),
            TypedValue::Float(_)
            | TypedValue::Double(_)
            | TypedValue::Decimal(_)
            | TypedValue::Money(_) => RenderedCell::new(
                value.as_f64().map(CellValue::Number),
                CellFormat::aligned(HorizontalAlign::Right),
            ),
            TypedValue::Boolean(b) => RenderedCell::new(
                Some(CellValue::Boolean(*b)),
                CellFormat::aligned(HorizontalAlign::Center),
            ),
            TypedValue::Date(d) => RenderedCell::new(
                Some(CellValue::Date(*d)),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(DATE_FORMAT),
            ),
            TypedValue::DateTime(dt) => RenderedCell::new(
                Some(CellValue::DateTime(*dt)),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(DATETIME_FORMAT),
            ),
            TypedValue::Time(t) => RenderedCell::new(
                Some(CellValue::Time(*t)),
                CellFormat::aligned(HorizontalAlign::Center).with_number_format(TIME_FORMAT),
            ),
            TypedValue::String(_) | TypedValue::Enum(_) => RenderedCell::new(
                Some(CellValue::Text(value.to_string())),
                CellFormat::default(),
            ),
        }
    }

    fn date_text(&self, value: &TypedValue) -> String {
        match value {
            TypedValue::Date(d) => self.codec.format_date(d),
            TypedValue::DateTime(dt) => self.codec.format_date(&dt.date()),
            other => other.to_string(),
        }
    }

    fn datetime_text(&self, value: &TypedValue) -> String {
        match value {
            TypedValue::DateTime(dt) => self.codec.format_datetime(dt),
            TypedValue::Date(d) => self.codec.format_datetime(&d.and_time(NaiveTime::MIN)),
            other => other.to_string(),
        }
    }

    fn time_text(&self, value: &TypedValue) -> String {
        match value {
            TypedValue::Time(t) => self.codec.format_time(t),
            TypedValue::DateTime(dt) => self.codec.format_time(&dt.time()),
            other => other.to_string(),
        }
    }
}

fn formula_text(cell: &CellData) -> Option<String> {
    cell.formula
        .as_deref()
        .map(|f| f.strip_prefix('=').unwrap_or(f).to_string())
}

/// Narrow a double into a numeric or boolean target.
fn narrow(n: f64, target: &TargetType) -> Option<TypedValue> {
    if !n.is_finite() && !matches!(target, TargetType::Float | TargetType::Double) {
        return None;
    }
    match target {
        // Out-of-width values are a miss, never saturated.
        TargetType::Int => (i32::MIN as f64..=i32::MAX as f64)
            .contains(&n.trunc())
            .then(|| TypedValue::Int(n as i32)),
        TargetType::Long => (i64::MIN as f64..i64::MAX as f64)
            .contains(&n.trunc())
            .then(|| TypedValue::Long(n as i64)),
        TargetType::Float => Some(TypedValue::Float(n as f32)),
        TargetType::Double => Some(TypedValue::Double(n)),
        TargetType::Decimal => parse_decimal(&n.to_string())
            .or_else(|| Decimal::from_f64(n))
            .map(TypedValue::Decimal),
        TargetType::Boolean => Some(TypedValue::Boolean(n.trunc() == 1.0)),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// `0x1F`, `#1F` and their negative forms.
fn parse_hex(text: &str) -> Option<i64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))?;
    let n = i64::from_str_radix(digits, 16).ok()?;
    Some(if negative { -n } else { n })
}

fn integer_of(value: &TypedValue) -> Option<i64> {
    match value {
        TypedValue::Int(i) => Some(*i as i64),
        TypedValue::Long(l) => Some(*l),
        TypedValue::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| finite_trunc(value.as_f64()?)),
        other => finite_trunc(other.as_f64()?),
    }
}

fn finite_trunc(n: f64) -> Option<i64> {
    n.is_finite().then(|| n.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::PatternDateTimeCodec;
    use crate::value::{EnumConstant, EnumDescriptor, Money};
    use chrono::NaiveDate;
    use sheetbind_common::{CellError, CellErrorKind};

    fn coercer(codec: &PatternDateTimeCodec) -> Coercer<'_> {
        Coercer::new(codec)
    }

    #[test]
    fn blank_and_error_cells_are_none() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let error = CellData::from_value(CellError::new(CellErrorKind::Div));
        for target in [TargetType::String, TargetType::Int, TargetType::Boolean] {
            assert_eq!(c.read_value(&CellData::default(), &target), None);
            assert_eq!(c.read_value(&error, &target), None);
        }
    }

    #[test]
    fn numeric_cells_narrow_to_target() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let cell = CellData::from_value(42.9);
        assert_eq!(c.read_value(&cell, &TargetType::Int), Some(TypedValue::Int(42)));
        assert_eq!(c.read_value(&cell, &TargetType::Long), Some(TypedValue::Long(42)));
        assert_eq!(c.read_value(&cell, &TargetType::Double), Some(TypedValue::Double(42.9)));
        assert_eq!(
            c.read_value(&cell, &TargetType::Decimal),
            Some(TypedValue::Decimal(Decimal::new(429, 1)))
        );
        assert_eq!(
            c.read_value(&CellData::from_value(1.0), &TargetType::Boolean),
            Some(TypedValue::Boolean(true))
        );
        assert_eq!(
            c.read_value(&CellData::from_value(1.0e15), &TargetType::String),
            Some(TypedValue::String("1000000000000000".into()))
        );
    }

    #[test]
    fn numeric_serials_become_dates_and_times() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let cell = CellData::from_value(45000.5);
        assert_eq!(
            c.read_value(&cell, &TargetType::Date),
            Some(TypedValue::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()))
        );
        assert_eq!(
            c.read_value(&cell, &TargetType::Time),
            Some(TypedValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()))
        );
        assert_eq!(c.read_value(&CellData::from_value(-5.0), &TargetType::Date), None);
    }

    #[test]
    fn out_of_width_integers_do_not_convert() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let text = CellData::from_value("3000000000");
        let number = CellData::from_value(3.0e9);
        assert_eq!(c.read_value(&text, &TargetType::Int), None);
        assert_eq!(c.read_value(&number, &TargetType::Int), None);
        assert_eq!(
            c.read_value(&text, &TargetType::Long),
            Some(TypedValue::Long(3_000_000_000))
        );
        assert_eq!(
            c.read_value(&CellData::from_value("2147483647.9"), &TargetType::Int),
            Some(TypedValue::Int(i32::MAX))
        );
        assert_eq!(
            c.read_value(&CellData::from_value(-2_147_483_648.0), &TargetType::Int),
            Some(TypedValue::Int(i32::MIN))
        );
        assert_eq!(c.read_value(&CellData::from_value(1.0e19), &TargetType::Long), None);
    }

    #[test]
    fn text_cells_parse_by_target() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let text = |s: &str| CellData::from_value(s);
        assert_eq!(c.read_value(&text(" 30 "), &TargetType::Int), Some(TypedValue::Int(30)));
        assert_eq!(c.read_value(&text("abc"), &TargetType::Int), None);
        assert_eq!(c.read_value(&text("0x1F"), &TargetType::Int), Some(TypedValue::Int(31)));
        assert_eq!(
            c.read_value(&text(" Yes "), &TargetType::Boolean),
            Some(TypedValue::Boolean(true))
        );
        assert_eq!(
            c.read_value(&text("no"), &TargetType::Boolean),
            Some(TypedValue::Boolean(false))
        );
        assert_eq!(
            c.read_value(&text("2024-02-29"), &TargetType::Date),
            Some(TypedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            c.read_value(&text("34.10"), &TargetType::Decimal),
            Some(TypedValue::Decimal(Decimal::new(3410, 2)))
        );
    }

    #[test]
    fn enum_resolution_is_case_insensitive() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let target = TargetType::enumeration(EnumDescriptor::new(
            "Gender",
            vec![EnumConstant::new("Male"), EnumConstant::new("Female")],
        ));
        for input in ["MALE", "male", "Male"] {
            assert_eq!(
                c.read_value(&CellData::from_value(input), &target),
                Some(TypedValue::Enum("Male".into()))
            );
        }
        assert_eq!(c.read_value(&CellData::from_value("other"), &target), None);
    }

    #[test]
    fn booleans_and_formulas() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let flag = CellData::from_value(true);
        assert_eq!(c.read_value(&flag, &TargetType::Boolean), Some(TypedValue::Boolean(true)));
        assert_eq!(c.read_value(&flag, &TargetType::Int), Some(TypedValue::String("true".into())));

        let mut formula = CellData::from_formula("=SUM(A1:A3)");
        formula.value = Some(CellValue::Number(6.0));
        assert_eq!(
            c.read_value(&formula, &TargetType::Int),
            Some(TypedValue::String("SUM(A1:A3)".into()))
        );
        assert_eq!(c.read_raw(&formula), Some(TypedValue::String("SUM(A1:A3)".into())));
        assert_eq!(c.read_raw(&CellData::from_value(7i64)), Some(TypedValue::Double(7.0)));
    }

    #[test]
    fn double_cells_use_precision_and_currency() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let plain = c.write_value(Some(&TypedValue::Double(3.5)), Some(RawType::Double), 2);
        assert_eq!(plain.value, Some(CellValue::Number(3.5)));
        assert_eq!(plain.format.number_format.as_deref(), Some("0.00"));
        assert_eq!(plain.format.horizontal, Some(HorizontalAlign::Right));

        let money = TypedValue::Money(Money::new(Decimal::new(1250, 2), "EUR"));
        let cell = c.write_value(Some(&money), Some(RawType::Double), 0);
        assert_eq!(cell.value, Some(CellValue::Number(12.5)));
        assert_eq!(cell.format.number_format.as_deref(), Some("0\"(EUR)\""));
    }

    #[test]
    fn numeric_write_failures_leave_cell_blank() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let cell = c.write_value(Some(&TypedValue::from("n/a")), Some(RawType::Double), 0);
        assert_eq!(cell.value, None);
        assert!(cell.failure.is_some());

        let int = c.write_value(Some(&TypedValue::from(" 12 ")), Some(RawType::Integer), 0);
        assert_eq!(int.value, Some(CellValue::Int(12)));
        assert!(int.failure.is_none());
    }

    #[test]
    fn text_and_temporal_shapes() {
        let codec = PatternDateTimeCodec::default();
        let c = coercer(&codec);
        let text = c.write_value(Some(&TypedValue::from("007")), Some(RawType::String), 0);
        assert_eq!(text.value, Some(CellValue::Text("007".into())));
        assert_eq!(text.format.number_format.as_deref(), Some("@"));

        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let cell = c.write_value(Some(&TypedValue::Date(date)), Some(RawType::DateTime), 0);
        assert_eq!(cell.value, Some(CellValue::Text("2024-05-06 00:00:00".into())));
        assert_eq!(cell.format.horizontal, Some(HorizontalAlign::Center));

        let pct = c.write_value(Some(&TypedValue::Double(0.125)), Some(RawType::Percent), 0);
        assert_eq!(pct.value, Some(CellValue::Number(0.125)));
        assert_eq!(pct.format.number_format.as_deref(), Some("0.00%"));
    }
}
