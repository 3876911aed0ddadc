use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Amount paired with an ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// A cell value after coercion to the column's target type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Name of the matched enumeration constant.
    Enum(String),
    Money(Money),
}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TypedValue::String(s) => s.hash(state),
            TypedValue::Boolean(b) => b.hash(state),
            TypedValue::Int(i) => i.hash(state),
            TypedValue::Long(l) => l.hash(state),
            TypedValue::Float(f) => f.to_bits().hash(state),
            TypedValue::Double(d) => d.to_bits().hash(state),
            TypedValue::Decimal(d) => d.hash(state),
            TypedValue::Date(d) => d.hash(state),
            TypedValue::DateTime(dt) => dt.hash(state),
            TypedValue::Time(t) => t.hash(state),
            TypedValue::Enum(e) => e.hash(state),
            TypedValue::Money(m) => m.hash(state),
        }
    }
}

impl Eq for TypedValue {}

impl Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => write!(f, "{s}"),
            TypedValue::Boolean(b) => write!(f, "{b}"),
            TypedValue::Int(i) => write!(f, "{i}"),
            TypedValue::Long(l) => write!(f, "{l}"),
            TypedValue::Float(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Decimal(d) => write!(f, "{d}"),
            TypedValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TypedValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            TypedValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            TypedValue::Enum(name) => write!(f, "{name}"),
            TypedValue::Money(m) => write!(f, "{} {}", m.amount, m.currency),
        }
    }
}

impl TypedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::Int(_) => "int",
            TypedValue::Long(_) => "long",
            TypedValue::Float(_) => "float",
            TypedValue::Double(_) => "double",
            TypedValue::Decimal(_) => "decimal",
            TypedValue::Date(_) => "date",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::Time(_) => "time",
            TypedValue::Enum(_) => "enum",
            TypedValue::Money(_) => "money",
        }
    }

    /// Numeric view used by range checks and numeric cells. Text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Int(i) => Some(*i as f64),
            TypedValue::Long(l) => Some(*l as f64),
            TypedValue::Float(v) => Some(*v as f64),
            TypedValue::Double(v) => Some(*v),
            TypedValue::Decimal(d) => d.to_f64(),
            TypedValue::Money(m) => m.amount.to_f64(),
            TypedValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) | TypedValue::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        TypedValue::Int(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Long(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Double(value)
    }
}

impl From<Decimal> for TypedValue {
    fn from(value: Decimal) -> Self {
        TypedValue::Decimal(value)
    }
}

impl From<NaiveDate> for TypedValue {
    fn from(value: NaiveDate) -> Self {
        TypedValue::Date(value)
    }
}

impl From<Money> for TypedValue {
    fn from(value: Money) -> Self {
        TypedValue::Money(value)
    }
}

/// One constant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    /// Custom text matched instead of the name when present.
    pub value: Option<String>,
}

impl EnumConstant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Text a cell must hold to select this constant.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.name)
    }
}

/// Runtime description of an enumeration target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    pub constants: Vec<EnumConstant>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>, constants: Vec<EnumConstant>) -> Self {
        Self {
            name: name.into(),
            constants,
        }
    }

    /// First constant whose text matches ignoring case and surrounding blanks.
    pub fn resolve(&self, text: &str) -> Option<&EnumConstant> {
        let text = text.trim();
        self.constants
            .iter()
            .find(|c| c.text().to_lowercase() == text.to_lowercase())
    }

    pub fn by_name(&self, name: &str) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

/// Rust enums that can be bound to a column.
pub trait CellEnum: Sized + Copy + Send + Sync + 'static {
    fn constants() -> &'static [Self];
    fn name(&self) -> &'static str;

    fn custom_value(&self) -> Option<&'static str> {
        None
    }

    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn descriptor() -> EnumDescriptor {
        EnumDescriptor::new(
            Self::type_name(),
            Self::constants()
                .iter()
                .map(|c| EnumConstant {
                    name: c.name().to_string(),
                    value: c.custom_value().map(str::to_string),
                })
                .collect(),
        )
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::constants().iter().copied().find(|c| c.name() == name)
    }
}

/// Semantic type a column coerces its cells to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    String,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Date,
    DateTime,
    Time,
    Enum(Arc<EnumDescriptor>),
}

impl TargetType {
    pub fn enumeration(descriptor: EnumDescriptor) -> Self {
        TargetType::Enum(Arc::new(descriptor))
    }

    pub fn of_enum<E: CellEnum>() -> Self {
        Self::enumeration(E::descriptor())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TargetType::Int
                | TargetType::Long
                | TargetType::Float
                | TargetType::Double
                | TargetType::Decimal
        )
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::String => f.write_str("string"),
            TargetType::Boolean => f.write_str("boolean"),
            TargetType::Int => f.write_str("int"),
            TargetType::Long => f.write_str("long"),
            TargetType::Float => f.write_str("float"),
            TargetType::Double => f.write_str("double"),
            TargetType::Decimal => f.write_str("decimal"),
            TargetType::Date => f.write_str("date"),
            TargetType::DateTime => f.write_str("datetime"),
            TargetType::Time => f.write_str("time"),
            TargetType::Enum(d) => write!(f, "enum {}", d.name),
        }
    }
}
