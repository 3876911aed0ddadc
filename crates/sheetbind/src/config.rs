use std::fmt;

use crate::constraint::ColumnConstraint;
use crate::value::{TargetType, TypedValue};

/// Coarse formatting tag that shapes written cells independently of the
/// target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawType {
    Integer,
    Double,
    Date,
    DateTime,
    Time,
    Percent,
    Boolean,
    PickList,
    ComboBox,
    String,
    TextArea,
    Attachment,
}

impl RawType {
    /// Case-insensitive; unknown tags fall back to `String`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => RawType::Integer,
            "DOUBLE" | "CURRENCY" => RawType::Double,
            "DATE" => RawType::Date,
            "DATETIME" => RawType::DateTime,
            "TIME" => RawType::Time,
            "PERCENT" => RawType::Percent,
            "BOOLEAN" => RawType::Boolean,
            "PICKLIST" => RawType::PickList,
            "COMBOBOX" => RawType::ComboBox,
            "TEXTAREA" => RawType::TextArea,
            "ATTACHMENT" => RawType::Attachment,
            _ => RawType::String,
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RawType::Integer => "INTEGER",
            RawType::Double => "DOUBLE",
            RawType::Date => "DATE",
            RawType::DateTime => "DATETIME",
            RawType::Time => "TIME",
            RawType::Percent => "PERCENT",
            RawType::Boolean => "BOOLEAN",
            RawType::PickList => "PICKLIST",
            RawType::ComboBox => "COMBOBOX",
            RawType::String => "STRING",
            RawType::TextArea => "TEXTAREA",
            RawType::Attachment => "ATTACHMENT",
        })
    }
}

/// Declarative description of one column.
///
/// Built once and shared across passes; it holds no per-pass state.
#[derive(Debug, Clone)]
pub struct ColumnConfiguration {
    pub key: String,
    /// Zero-based, authoritative for both reading and writing.
    pub column_index: u32,
    pub title: String,
    pub label: Option<String>,
    /// `None` reads the raw cell value without coercion.
    pub target_type: Option<TargetType>,
    /// `None` writes plain text.
    pub raw_type: Option<RawType>,
    pub writable: bool,
    pub display: bool,
    pub length: Option<u32>,
    pub constraints: Vec<ColumnConstraint>,
    pub sample: Option<String>,
}

impl ColumnConfiguration {
    pub fn new(key: impl Into<String>, column_index: u32) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            column_index,
            label: None,
            target_type: None,
            raw_type: None,
            writable: true,
            display: true,
            length: None,
            constraints: Vec::new(),
            sample: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn target(mut self, target: TargetType) -> Self {
        self.target_type = Some(target);
        self
    }

    pub fn raw_type(mut self, raw_type: RawType) -> Self {
        self.raw_type = Some(raw_type);
        self
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.display = false;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = Some(sample.into());
        self
    }

    pub fn constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Decimal places for written numbers, from the first fixed-precision rule.
    pub fn precision_digits(&self) -> u32 {
        self.constraints
            .iter()
            .find_map(|c| match c {
                ColumnConstraint::FixedPrecision { digits } => Some(*digits),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Text an enum constant is read from and written as, when this is an
    /// enum column and the constant declares custom text.
    pub fn enum_text(&self, value: &TypedValue) -> Option<TypedValue> {
        match (&self.target_type, value) {
            (Some(TargetType::Enum(descriptor)), TypedValue::Enum(name)) => descriptor
                .by_name(name)
                .and_then(|c| c.value.clone())
                .map(TypedValue::Enum),
            _ => None,
        }
    }

    /// Attachment columns without a target type are never read.
    pub fn skips_read(&self) -> bool {
        self.target_type.is_none() && self.raw_type == Some(RawType::Attachment)
    }
}
