use crate::IoError;
use crate::traits::{
    BackendCaps, CellData, CellFormat, DataValidation, SheetData, SpreadsheetReader,
    SpreadsheetWriter, StyleId,
};
use serde::{Deserialize, Serialize};
use sheetbind_common::{CellError, CellValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    styles: Vec<CellFormat>,
    #[serde(default)]
    sheets: BTreeMap<String, JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonSheet {
    #[serde(default)]
    cells: Vec<JsonCell>,
    #[serde(default)]
    dimensions: Option<(u32, u32)>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    date_system_1904: bool,
    #[serde(default)]
    hidden_columns: BTreeSet<u32>,
    #[serde(default)]
    column_widths: BTreeMap<u32, f64>,
    #[serde(default)]
    validations: Vec<DataValidation>,
}

impl JsonSheet {
    fn extent(&self) -> Option<(u32, u32)> {
        if let Some(dims) = self.dimensions {
            return Some(dims);
        }
        let rows = self.cells.iter().map(|c| c.row + 1).max()?;
        let cols = self.cells.iter().map(|c| c.col + 1).max()?;
        Some((rows, cols))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    row: u32,
    col: u32,
    #[serde(default)]
    value: Option<JsonValue>,
    #[serde(default)]
    formula: Option<String>,
    #[serde(default)]
    style: Option<u32>,
}

impl JsonCell {
    fn to_cell_data(&self) -> CellData {
        CellData {
            value: self.value.as_ref().map(json_to_value),
            formula: self.formula.clone(),
            style: self.style,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "value")]
enum JsonValue {
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Empty,
    Date(String),
    DateTime(String),
    Time(String),
    Error(String),
}

/// In-memory workbook that round-trips through a JSON document.
pub struct JsonAdapter {
    data: JsonWorkbook,
    path: Option<PathBuf>,
    caps: BackendCaps,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self {
            data: JsonWorkbook::default(),
            path: None,
            caps: BackendCaps {
                read: true,
                write: true,
                formulas: true,
                styles: true,
                bytes_input: true,
                hidden_columns: true,
                column_widths: true,
                data_validations: true,
                date_system_1904: true,
            },
        }
    }

    fn to_sheet_data(js: &JsonSheet) -> SheetData {
        let cells = js
            .cells
            .iter()
            .map(|c| ((c.row, c.col), c.to_cell_data()))
            .collect();
        SheetData {
            cells,
            dimensions: js.extent(),
            date_system_1904: js.date_system_1904,
            hidden: js.hidden,
            hidden_columns: js.hidden_columns.clone(),
            column_widths: js.column_widths.clone(),
            validations: js.validations.clone(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        Ok(JsonAdapter {
            data: serde_json::from_str(json)?,
            ..JsonAdapter::new()
        })
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Write the workbook to `path` and remember it for later `save` calls.
    pub fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        self.path = Some(path.as_ref().to_path_buf());
        self.save()
    }

    /// Look up a registered style.
    pub fn style(&self, id: StyleId) -> Option<&CellFormat> {
        self.data.styles.get(id as usize)
    }

    /// Style attached to a cell, resolved to its format.
    pub fn cell_format(&self, sheet: &str, row: u32, col: u32) -> Option<&CellFormat> {
        let cell = self.find_cell(sheet, row, col)?;
        self.style(cell.style?)
    }

    pub fn hidden_columns(&self, sheet: &str) -> Vec<u32> {
        self.data
            .sheets
            .get(sheet)
            .map(|s| s.hidden_columns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn column_width(&self, sheet: &str, col: u32) -> Option<f64> {
        self.data
            .sheets
            .get(sheet)
            .and_then(|s| s.column_widths.get(&col).copied())
    }

    pub fn validations(&self, sheet: &str) -> &[DataValidation] {
        self.data
            .sheets
            .get(sheet)
            .map(|s| s.validations.as_slice())
            .unwrap_or_default()
    }

    // Backend-specific helpers (not part of SpreadsheetWriter)
    fn ensure_sheet_mut(&mut self, name: &str) -> &mut JsonSheet {
        self.data.sheets.entry(name.to_string()).or_default()
    }

    fn find_cell(&self, sheet: &str, row: u32, col: u32) -> Option<&JsonCell> {
        self.data
            .sheets
            .get(sheet)?
            .cells
            .iter()
            .find(|c| c.row == row && c.col == col)
    }

    pub fn set_dimensions(&mut self, sheet: &str, dims: Option<(u32, u32)>) {
        self.ensure_sheet_mut(sheet).dimensions = dims;
    }

    pub fn set_date_system_1904(&mut self, sheet: &str, value: bool) {
        self.ensure_sheet_mut(sheet).date_system_1904 = value;
    }

    /// Convenience for fixtures: write a row of values starting at column 0.
    pub fn append_row<V: Into<CellValue>>(
        &mut self,
        sheet: &str,
        row: u32,
        values: impl IntoIterator<Item = V>,
    ) {
        let js = self.ensure_sheet_mut(sheet);
        for (col, value) in values.into_iter().enumerate() {
            let value = value.into();
            if value.is_empty() {
                continue;
            }
            js.cells.push(JsonCell {
                row,
                col: col as u32,
                value: Some(value_to_json(&value)),
                formula: None,
                style: None,
            });
        }
    }
}

impl SpreadsheetReader for JsonAdapter {
    type Error = IoError;

    fn capabilities(&self) -> BackendCaps {
        self.caps.clone()
    }

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.data.sheets.keys().cloned().collect())
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let data: JsonWorkbook = serde_json::from_reader(reader)?;
        Ok(JsonAdapter {
            data,
            path: Some(path.as_ref().to_path_buf()),
            ..JsonAdapter::new()
        })
    }

    fn open_reader(reader: Box<dyn Read + Send + Sync>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let data: JsonWorkbook = serde_json::from_reader(reader)?;
        Ok(JsonAdapter {
            data,
            ..JsonAdapter::new()
        })
    }

    fn open_bytes(bytes: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let data: JsonWorkbook = serde_json::from_slice(&bytes)?;
        Ok(JsonAdapter {
            data,
            ..JsonAdapter::new()
        })
    }

    fn read_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellData>, Self::Error> {
        Ok(self.find_cell(sheet, row, col).map(JsonCell::to_cell_data))
    }

    fn read_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<BTreeMap<(u32, u32), CellData>, Self::Error> {
        let Some(js) = self.data.sheets.get(sheet) else {
            return Ok(BTreeMap::new());
        };
        Ok(js
            .cells
            .iter()
            .filter(|c| c.row >= start.0 && c.row <= end.0 && c.col >= start.1 && c.col <= end.1)
            .map(|c| ((c.row, c.col), c.to_cell_data()))
            .collect())
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error> {
        match self.data.sheets.get(sheet) {
            Some(js) => Ok(Self::to_sheet_data(js)),
            None => Err(IoError::SheetNotFound(sheet.to_string())),
        }
    }

    fn sheet_bounds(&self, sheet: &str) -> Option<(u32, u32)> {
        self.data.sheets.get(sheet).and_then(JsonSheet::extent)
    }

    fn date_system_1904(&self, sheet: &str) -> bool {
        self.data
            .sheets
            .get(sheet)
            .is_some_and(|s| s.date_system_1904)
    }
}

impl SpreadsheetWriter for JsonAdapter {
    type Error = IoError;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error> {
        if let Some(style) = data.style {
            if style as usize >= self.data.styles.len() {
                return Err(IoError::UnknownStyle(style));
            }
        }
        let value = data.value.as_ref().map(value_to_json);
        let sheet_entry = self.ensure_sheet_mut(sheet);
        if let Some(cell) = sheet_entry
            .cells
            .iter_mut()
            .find(|c| c.row == row && c.col == col)
        {
            cell.value = value;
            cell.formula = data.formula;
            cell.style = data.style;
        } else {
            sheet_entry.cells.push(JsonCell {
                row,
                col,
                value,
                formula: data.formula,
                style: data.style,
            });
        }
        Ok(())
    }

    fn clear_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<(), Self::Error> {
        if let Some(js) = self.data.sheets.get_mut(sheet) {
            js.cells.retain(|c| {
                !(c.row >= start.0 && c.row <= end.0 && c.col >= start.1 && c.col <= end.1)
            });
        }
        Ok(())
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        self.ensure_sheet_mut(name);
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        self.data.sheets.remove(name);
        Ok(())
    }

    fn rename_sheet(&mut self, old: &str, new: &str) -> Result<(), Self::Error> {
        match self.data.sheets.remove(old) {
            Some(sheet) => {
                self.data.sheets.insert(new.to_string(), sheet);
                Ok(())
            }
            None => Err(IoError::SheetNotFound(old.to_string())),
        }
    }

    fn register_style(&mut self, format: &CellFormat) -> Result<StyleId, Self::Error> {
        if let Some(idx) = self.data.styles.iter().position(|s| s == format) {
            return Ok(idx as StyleId);
        }
        self.data.styles.push(format.clone());
        Ok((self.data.styles.len() - 1) as StyleId)
    }

    fn set_column_hidden(
        &mut self,
        sheet: &str,
        col: u32,
        hidden: bool,
    ) -> Result<(), Self::Error> {
        let js = self.ensure_sheet_mut(sheet);
        if hidden {
            js.hidden_columns.insert(col);
        } else {
            js.hidden_columns.remove(&col);
        }
        Ok(())
    }

    fn set_column_width(&mut self, sheet: &str, col: u32, width: f64) -> Result<(), Self::Error> {
        self.ensure_sheet_mut(sheet).column_widths.insert(col, width);
        Ok(())
    }

    fn add_data_validation(
        &mut self,
        sheet: &str,
        validation: DataValidation,
    ) -> Result<(), Self::Error> {
        self.ensure_sheet_mut(sheet).validations.push(validation);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), Self::Error> {
        if let Some(path) = &self.path {
            let mut file = File::create(path)?;
            let s = serde_json::to_string_pretty(&self.data)?;
            file.write_all(s.as_bytes())?;
        }
        Ok(())
    }
}

fn value_to_json(v: &CellValue) -> JsonValue {
    match v {
        CellValue::Int(i) => JsonValue::Int(*i),
        CellValue::Number(n) => JsonValue::Number(*n),
        CellValue::Text(s) => JsonValue::Text(s.clone()),
        CellValue::Boolean(b) => JsonValue::Boolean(*b),
        CellValue::Empty => JsonValue::Empty,
        CellValue::Date(d) => JsonValue::Date(d.to_string()),
        CellValue::DateTime(dt) => JsonValue::DateTime(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        CellValue::Time(t) => JsonValue::Time(t.format("%H:%M:%S").to_string()),
        CellValue::Error(e) => JsonValue::Error(e.kind.to_string()),
    }
}

/// Stored dates that fail to parse come back as text rather than a made-up date.
fn json_to_value(v: &JsonValue) -> CellValue {
    match v {
        JsonValue::Int(i) => CellValue::Int(*i),
        JsonValue::Number(n) => CellValue::Number(*n),
        JsonValue::Text(s) => CellValue::Text(s.clone()),
        JsonValue::Boolean(b) => CellValue::Boolean(*b),
        JsonValue::Empty => CellValue::Empty,
        JsonValue::Date(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        JsonValue::DateTime(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        JsonValue::Time(s) => chrono::NaiveTime::parse_from_str(s, "%H:%M:%S")
            .map(CellValue::Time)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        JsonValue::Error(code) => CellValue::Error(CellError::from_error_string(code)),
    }
}
