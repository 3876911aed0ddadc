//! Read passes: rows in, records out.
//!
//! A pass walks rows top to bottom. Rows whose configured cells are all
//! blank are skipped. The first row that breaks a constraint ends the pass;
//! records read before it are kept and returned alongside the error.

use std::collections::BTreeMap;
use std::sync::Arc;

use sheetbind_common::DateSystem;
use sheetbind_io::SpreadsheetReader;

use crate::coerce::Coercer;
use crate::config::ColumnConfiguration;
use crate::constraint::CheckedValue;
use crate::datetime::{DateTimeCodec, PatternDateTimeCodec};
use crate::error::SheetBindError;
use crate::message::{DefaultCatalog, MessageCatalog};
use crate::record::RecordBinding;
use crate::validate::{
    BindingConstraintValidator, CellAddressing, InvalidRowError, RecordValidator, RowValidator,
    violations_to_cell_errors,
};
use crate::value::TypedValue;

/// Key-value record.
pub type MapRecord = BTreeMap<String, Option<TypedValue>>;
/// Ordered record, one entry per configured column.
pub type ListRecord = Vec<Option<TypedValue>>;

#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Zero-based first data row. Defaults to 1, below a header row.
    pub first_row: u32,
    /// Inclusive; `None` reads to the last populated row.
    pub last_row: Option<u32>,
    pub locale: Option<String>,
    pub addressing: CellAddressing,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            first_row: 1,
            last_row: None,
            locale: None,
            addressing: CellAddressing::Title,
        }
    }
}

impl ReadOptions {
    pub fn starting_at(first_row: u32) -> Self {
        Self {
            first_row,
            ..Self::default()
        }
    }
}

/// Result of one read pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome<R> {
    /// Valid records in row order.
    pub records: Vec<R>,
    /// The row that stopped the pass, if any.
    pub error: Option<InvalidRowError<R>>,
    /// Rows dropped because the typed record could not be built.
    pub skipped_rows: Vec<u32>,
}

impl<R> Default for ReadOutcome<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            error: None,
            skipped_rows: Vec::new(),
        }
    }
}

impl<R> ReadOutcome<R> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All records, or the partial list together with the failing row.
    pub fn into_result(self) -> Result<Vec<R>, (Vec<R>, InvalidRowError<R>)> {
        match self.error {
            None => Ok(self.records),
            Some(error) => Err((self.records, error)),
        }
    }
}

/// One row after coercion.
struct RowValues {
    values: Vec<Option<TypedValue>>,
    /// Raw value of cells that were present but did not coerce.
    unconverted: Vec<Option<TypedValue>>,
}

impl RowValues {
    fn checked(&self) -> Vec<CheckedValue<'_>> {
        self.values
            .iter()
            .zip(&self.unconverted)
            .map(|(value, raw)| match (value, raw) {
                (Some(v), _) => CheckedValue::Value(v),
                (None, Some(raw)) => CheckedValue::Unconverted(raw),
                (None, None) => CheckedValue::Missing,
            })
            .collect()
    }
}

pub struct SheetReader {
    options: ReadOptions,
    catalog: Arc<dyn MessageCatalog>,
    codec: Arc<dyn DateTimeCodec>,
}

impl Default for SheetReader {
    fn default() -> Self {
        Self::new(ReadOptions::default())
    }
}

impl SheetReader {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            catalog: Arc::new(DefaultCatalog),
            codec: Arc::new(PatternDateTimeCodec::default()),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn DateTimeCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    fn row_validator(&self) -> RowValidator {
        RowValidator::new(self.catalog.clone())
            .with_locale(self.options.locale.clone())
            .with_addressing(self.options.addressing)
    }

    /// Records as value sequences in column order.
    pub fn read_lists<S: SpreadsheetReader>(
        &self,
        source: &mut S,
        sheet: &str,
        columns: &[ColumnConfiguration],
    ) -> Result<ReadOutcome<ListRecord>, SheetBindError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("read_pass", sheet, shape = "list").entered();
        self.read_validated(source, sheet, columns, |row| row.values)
    }

    /// Records keyed by column key.
    pub fn read_maps<S: SpreadsheetReader>(
        &self,
        source: &mut S,
        sheet: &str,
        columns: &[ColumnConfiguration],
    ) -> Result<ReadOutcome<MapRecord>, SheetBindError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("read_pass", sheet, shape = "map").entered();
        self.read_validated(source, sheet, columns, |row| {
            columns
                .iter()
                .map(|c| c.key.clone())
                .zip(row.values)
                .collect()
        })
    }

    /// Typed records checked against the binding's own column constraints.
    pub fn read_records<T, S: SpreadsheetReader>(
        &self,
        source: &mut S,
        sheet: &str,
        binding: &Arc<RecordBinding<T>>,
    ) -> Result<ReadOutcome<T>, SheetBindError> {
        let mut validator =
            BindingConstraintValidator::new(binding.clone()).with_row_validator(self.row_validator());
        self.read_records_with(source, sheet, binding, &mut validator)
    }

    /// Typed records checked by a caller-supplied record validator.
    pub fn read_records_with<T, S, V>(
        &self,
        source: &mut S,
        sheet: &str,
        binding: &RecordBinding<T>,
        validator: &mut V,
    ) -> Result<ReadOutcome<T>, SheetBindError>
    where
        S: SpreadsheetReader,
        V: RecordValidator<T> + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("read_pass", sheet, shape = "record").entered();

        let columns = binding.columns();
        let rows = self.row_range(source, sheet)?;
        let coercer = self.coercer(source, sheet);
        let messages = self.row_validator();
        let mut outcome = ReadOutcome::default();
        validator.begin_pass();

        for row in rows {
            let Some(values) = self.read_row(&coercer, source, sheet, row, columns)? else {
                #[cfg(feature = "tracing")]
                tracing::debug!(row, "blank row skipped");
                continue;
            };
            let record = match binding.build_record(values.values) {
                Ok(record) => record,
                #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(row, error = %err, "record could not be built; row skipped");
                    outcome.skipped_rows.push(row);
                    continue;
                }
            };
            let violations = validator.validate(row, &record);
            if !violations.is_empty() {
                #[cfg(feature = "tracing")]
                tracing::info!(row, violations = violations.len(), "invalid row ends the pass");
                let cells = violations_to_cell_errors(row, violations);
                outcome.error = Some(messages.row_error(row, record, cells));
                break;
            }
            outcome.records.push(record);
        }
        Ok(outcome)
    }

    fn read_validated<S, R>(
        &self,
        source: &mut S,
        sheet: &str,
        columns: &[ColumnConfiguration],
        shape: impl Fn(RowValues) -> R,
    ) -> Result<ReadOutcome<R>, SheetBindError>
    where
        S: SpreadsheetReader,
    {
        let rows = self.row_range(source, sheet)?;
        let coercer = self.coercer(source, sheet);
        let mut validator = self.row_validator();
        let mut outcome = ReadOutcome::default();

        for row in rows {
            let Some(values) = self.read_row(&coercer, source, sheet, row, columns)? else {
                #[cfg(feature = "tracing")]
                tracing::debug!(row, "blank row skipped");
                continue;
            };
            let errors = validator.validate_row(row, columns, &values.checked());
            let record = shape(values);
            if !errors.is_empty() {
                #[cfg(feature = "tracing")]
                tracing::info!(row, errors = errors.len(), "invalid row ends the pass");
                outcome.error = Some(validator.row_error(row, record, errors));
                break;
            }
            outcome.records.push(record);
        }
        Ok(outcome)
    }

    fn coercer<S: SpreadsheetReader>(&self, source: &S, sheet: &str) -> Coercer<'_> {
        let date_system = if source.date_system_1904(sheet) {
            DateSystem::Excel1904
        } else {
            DateSystem::Excel1900
        };
        Coercer::new(self.codec.as_ref()).with_date_system(date_system)
    }

    fn row_range<S: SpreadsheetReader>(
        &self,
        source: &mut S,
        sheet: &str,
    ) -> Result<std::ops::RangeInclusive<u32>, SheetBindError> {
        let names = source.sheet_names().map_err(SheetBindError::backend)?;
        if !names.iter().any(|n| n == sheet) {
            return Err(SheetBindError::SheetNotFound(sheet.to_string()));
        }
        let first = self.options.first_row;
        let Some((rows, _)) = source.sheet_bounds(sheet).filter(|(rows, _)| *rows > 0) else {
            return Ok(1..=0);
        };
        let last = match self.options.last_row {
            Some(last) => last.min(rows - 1),
            None => rows - 1,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(first, last, "row range");
        if first > last {
            return Ok(1..=0);
        }
        Ok(first..=last)
    }

    /// Coerce the configured cells of one row; `None` for a blank row.
    fn read_row<S: SpreadsheetReader>(
        &self,
        coercer: &Coercer<'_>,
        source: &mut S,
        sheet: &str,
        row: u32,
        columns: &[ColumnConfiguration],
    ) -> Result<Option<RowValues>, SheetBindError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(row, "reading row");
        let read: Vec<&ColumnConfiguration> = columns.iter().filter(|c| !c.skips_read()).collect();
        let (Some(min_col), Some(max_col)) = (
            read.iter().map(|c| c.column_index).min(),
            read.iter().map(|c| c.column_index).max(),
        ) else {
            return Ok(None);
        };
        let cells = source
            .read_range(sheet, (row, min_col), (row, max_col))
            .map_err(SheetBindError::backend)?;

        let mut values = Vec::with_capacity(columns.len());
        let mut unconverted = Vec::with_capacity(columns.len());
        for column in columns {
            let cell = if column.skips_read() {
                None
            } else {
                cells.get(&(row, column.column_index))
            };
            let (value, raw) = match (cell, &column.target_type) {
                (None, _) => (None, None),
                (Some(cell), None) => (coercer.read_raw(cell), None),
                (Some(cell), Some(target)) => match coercer.read_value(cell, target) {
                    Some(value) => (Some(value), None),
                    None => (None, coercer.read_raw(cell)),
                },
            };
            values.push(value);
            unconverted.push(raw);
        }

        if values.iter().all(Option::is_none) && unconverted.iter().all(Option::is_none) {
            return Ok(None);
        }
        Ok(Some(RowValues {
            values,
            unconverted,
        }))
    }
}
