use serde::{Deserialize, Serialize};
use sheetbind_common::{CellKind, CellRange, CellValue};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

pub type StyleId = u32;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellData {
    pub value: Option<CellValue>,
    pub formula: Option<String>,
    pub style: Option<StyleId>,
}

impl CellData {
    pub fn from_value<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: Some(value.into()),
            formula: None,
            style: None,
        }
    }

    pub fn from_formula(formula: impl Into<String>) -> Self {
        Self {
            value: None,
            formula: Some(formula.into()),
            style: None,
        }
    }

    /// A cell that carries only a style (used for formatted blanks).
    pub fn styled_blank(style: StyleId) -> Self {
        Self {
            value: None,
            formula: None,
            style: Some(style),
        }
    }

    pub fn with_style(mut self, style: StyleId) -> Self {
        self.style = Some(style);
        self
    }

    /// Storage kind: formula text wins over any cached value.
    pub fn kind(&self) -> CellKind {
        if self.formula.is_some() {
            return CellKind::Formula;
        }
        match &self.value {
            Some(v) => v.kind(),
            None => CellKind::Blank,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Presentation tag attached to a cell. Backends decide how to render it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellFormat {
    #[serde(default)]
    pub horizontal: Option<HorizontalAlign>,
    #[serde(default)]
    pub number_format: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub wrap_text: bool,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub fill: Option<String>,
}

impl CellFormat {
    pub fn aligned(horizontal: HorizontalAlign) -> Self {
        Self {
            horizontal: Some(horizontal),
            ..Self::default()
        }
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Value must be one of the listed entries.
    List { values: Vec<String> },
    /// Whole number between `min` and `max`, inclusive.
    IntegerBetween { min: i64, max: i64 },
    DecimalBetween { min: f64, max: f64 },
}

/// Input restriction installed on a block of cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataValidation {
    pub range: CellRange,
    pub rule: ValidationRule,
    #[serde(default)]
    pub show_error_box: bool,
    #[serde(default)]
    pub suppress_dropdown_arrow: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BackendCaps {
    pub read: bool,
    pub write: bool,
    pub formulas: bool,
    pub styles: bool,
    pub bytes_input: bool,
    pub hidden_columns: bool,
    pub column_widths: bool,
    pub data_validations: bool,
    pub date_system_1904: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SheetData {
    pub cells: BTreeMap<(u32, u32), CellData>,
    /// `(rows, cols)` extent, one past the last populated cell.
    pub dimensions: Option<(u32, u32)>,
    pub date_system_1904: bool,
    pub hidden: bool,
    pub hidden_columns: BTreeSet<u32>,
    pub column_widths: BTreeMap<u32, f64>,
    pub validations: Vec<DataValidation>,
}

pub trait SpreadsheetReader: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn capabilities(&self) -> BackendCaps;
    fn sheet_names(&self) -> Result<Vec<String>, Self::Error>;

    /// Constructor variants for different environments
    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn open_reader(reader: Box<dyn Read + Send + Sync>) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn read_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellData>, Self::Error> {
        // Default: fallback to range read
        let mut range = self.read_range(sheet, (row, col), (row, col))?;
        Ok(range.remove(&(row, col)))
    }

    fn read_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<BTreeMap<(u32, u32), CellData>, Self::Error>;

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error>;

    /// `(rows, cols)` extent of the sheet, or `None` if it holds no cells.
    fn sheet_bounds(&self, sheet: &str) -> Option<(u32, u32)>;

    /// Whether the sheet uses the 1904 date system for serials.
    fn date_system_1904(&self, _sheet: &str) -> bool {
        false
    }
}

pub trait SpreadsheetWriter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error>;

    fn write_range(
        &mut self,
        sheet: &str,
        cells: BTreeMap<(u32, u32), CellData>,
    ) -> Result<(), Self::Error> {
        for ((r, c), d) in cells {
            self.write_cell(sheet, r, c, d)?;
        }
        Ok(())
    }

    fn clear_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<(), Self::Error>;

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error>;
    fn delete_sheet(&mut self, name: &str) -> Result<(), Self::Error>;
    fn rename_sheet(&mut self, old: &str, new: &str) -> Result<(), Self::Error>;

    /// Register a cell format and get back the id cells refer to it by.
    /// Registering an equal format twice may return the same id.
    fn register_style(&mut self, format: &CellFormat) -> Result<StyleId, Self::Error>;

    fn set_column_hidden(&mut self, sheet: &str, col: u32, hidden: bool)
    -> Result<(), Self::Error>;

    /// Width in character units.
    fn set_column_width(&mut self, sheet: &str, col: u32, width: f64) -> Result<(), Self::Error>;

    fn add_data_validation(
        &mut self,
        sheet: &str,
        validation: DataValidation,
    ) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;
    fn save(&mut self) -> Result<(), Self::Error>;
}

pub trait SpreadsheetIO: SpreadsheetReader + SpreadsheetWriter {}

impl<T: SpreadsheetReader + SpreadsheetWriter> SpreadsheetIO for T {}
