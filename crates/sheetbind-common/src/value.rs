use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::CellError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Spreadsheet date-serial utilities ─────────────
1900 system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom, kept for compatibility)
  Serial 61 = 1900-03-01
1904 system:
  Serial 0  = 1904-01-01, no phantom day.
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

/// Base date for the 1900 date system. Serial 1 = base + 1 day = 1900-01-01.
const EPOCH_1900: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const PHANTOM_CUTOFF: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
const PHANTOM_STANDIN: NaiveDate = NaiveDate::from_ymd_opt(1900, 2, 28).unwrap();
const EPOCH_1904: NaiveDate = NaiveDate::from_ymd_opt(1904, 1, 1).unwrap();

const SECONDS_PER_DAY: i64 = 86_400;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateSystem {
    #[default]
    Excel1900,
    Excel1904,
}

impl DateSystem {
    pub fn datetime_to_serial(self, dt: &NaiveDateTime) -> f64 {
        let serial_days = match self {
            DateSystem::Excel1900 => {
                let days = (dt.date() - EPOCH_1900).num_days();
                // Dates on or after 1900-03-01 get +1 for the phantom Feb 29
                if dt.date() >= PHANTOM_CUTOFF {
                    days + 1
                } else {
                    days
                }
            }
            DateSystem::Excel1904 => (dt.date() - EPOCH_1904).num_days(),
        };
        let secs_in_day = dt.time().num_seconds_from_midnight() as f64;
        serial_days as f64 + secs_in_day / SECONDS_PER_DAY as f64
    }

    pub fn serial_to_datetime(self, serial: f64) -> NaiveDateTime {
        let total_secs = (serial * SECONDS_PER_DAY as f64).round() as i64;
        let days = total_secs.div_euclid(SECONDS_PER_DAY);
        let secs = total_secs.rem_euclid(SECONDS_PER_DAY) as u32;

        let date = match self {
            DateSystem::Excel1900 if days == 60 => PHANTOM_STANDIN,
            DateSystem::Excel1900 => {
                let offset = if days < 60 { days } else { days - 1 };
                EPOCH_1900 + ChronoDur::days(offset)
            }
            DateSystem::Excel1904 => EPOCH_1904 + ChronoDur::days(days),
        };
        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN);
        date.and_time(time)
    }
}

impl Display for DateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSystem::Excel1900 => write!(f, "1900"),
            DateSystem::Excel1904 => write!(f, "1904"),
        }
    }
}

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    DateSystem::Excel1900.datetime_to_serial(dt)
}

pub fn serial_to_datetime(serial: f64) -> NaiveDateTime {
    DateSystem::Excel1900.serial_to_datetime(serial)
}

/// Storage kind of a raw cell, as seen by the coercion layer.
///
/// Dates and times are `Numeric`: spreadsheets store them as serials and
/// only the display format tells them apart.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Numeric,
    Text,
    Boolean,
    Formula,
    Blank,
    Error,
}

impl Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellKind::Numeric => "numeric",
            CellKind::Text => "text",
            CellKind::Boolean => "boolean",
            CellKind::Formula => "formula",
            CellKind::Blank => "blank",
            CellKind::Error => "error",
        })
    }
}

/// A value as it sits in a cell, before any coercion to a target type.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Empty,
    Error(CellError),
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Int(i) => i.hash(state),
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Boolean(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Time(t) => t.hash(state),
            CellValue::Empty => state.write_u8(0),
            CellValue::Error(e) => e.hash(state),
        }
    }
}

impl Eq for CellValue {}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Time(t) => write!(f, "{t}"),
            CellValue::Empty => write!(f, ""),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

impl CellValue {
    /// Storage kind of the value alone. Formula cells are detected one level
    /// up, where the formula text lives.
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Int(_)
            | CellValue::Number(_)
            | CellValue::Date(_)
            | CellValue::DateTime(_)
            | CellValue::Time(_) => CellKind::Numeric,
            CellValue::Text(_) => CellKind::Text,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::Empty => CellKind::Blank,
            CellValue::Error(_) => CellKind::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_serial_number(&self) -> Option<f64> {
        self.as_serial_number_in(DateSystem::Excel1900)
    }

    pub fn as_serial_number_in(&self, system: DateSystem) -> Option<f64> {
        match self {
            CellValue::Date(d) => Some(system.datetime_to_serial(&d.and_time(NaiveTime::MIN))),
            CellValue::DateTime(dt) => Some(system.datetime_to_serial(dt)),
            CellValue::Time(t) => {
                Some(t.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY as f64)
            }
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Build a `Date` or `DateTime` from a serial, depending on whether
    /// the serial carries a time-of-day fraction.
    pub fn from_serial_number(serial: f64) -> Self {
        let dt = serial_to_datetime(serial);
        if dt.time() == NaiveTime::MIN {
            CellValue::Date(dt.date())
        } else {
            CellValue::DateTime(dt)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(value: NaiveTime) -> Self {
        CellValue::Time(value)
    }
}
