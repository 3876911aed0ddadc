//! Write passes: records in, formatted cells out.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use sheetbind_common::CellRange;
use sheetbind_io::{
    CellData, CellFormat, DataValidation, HorizontalAlign, SpreadsheetWriter, StyleId,
    ValidationRule,
};

use crate::coerce::Coercer;
use crate::config::ColumnConfiguration;
use crate::constraint::ColumnConstraint;
use crate::datetime::{DateTimeCodec, PatternDateTimeCodec};
use crate::error::SheetBindError;
use crate::reader::{ListRecord, MapRecord};
use crate::record::RecordBinding;
use crate::value::TypedValue;

const HEADER_FILL: &str = "#00FF00";

#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Zero-based row of the first emitted row (header or data).
    pub first_row: u32,
    /// Title row.
    pub header: bool,
    /// Label row below the titles.
    pub sub_header: bool,
    /// Locked row of sample values above the data.
    pub sample_row: bool,
    /// Input annotations cover at least this many data rows, so empty
    /// templates still carry them.
    pub min_annotated_rows: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            first_row: 0,
            header: true,
            sub_header: false,
            sample_row: false,
            min_annotated_rows: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub rows_written: usize,
    pub first_data_row: u32,
    /// Input-restriction annotations installed.
    pub annotations: usize,
    /// Cells left blank because their value did not fit the column.
    pub formatting_failures: usize,
    pub hidden_columns: Vec<u32>,
}

/// Style ids registered with the sink during one write pass.
#[derive(Debug, Default)]
pub struct StyleCache {
    ids: FxHashMap<CellFormat, StyleId>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id<W: SpreadsheetWriter>(
        &mut self,
        sink: &mut W,
        format: &CellFormat,
    ) -> Result<StyleId, SheetBindError> {
        if let Some(id) = self.ids.get(format) {
            return Ok(*id);
        }
        let id = sink.register_style(format).map_err(SheetBindError::backend)?;
        self.ids.insert(format.clone(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn header_format() -> CellFormat {
    CellFormat {
        horizontal: Some(HorizontalAlign::Center),
        wrap_text: true,
        bold: true,
        fill: Some(HEADER_FILL.to_string()),
        ..CellFormat::default()
    }
}

pub struct SheetWriter {
    options: WriteOptions,
    codec: Arc<dyn DateTimeCodec>,
}

impl Default for SheetWriter {
    fn default() -> Self {
        Self::new(WriteOptions::default())
    }
}

impl SheetWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self {
            options,
            codec: Arc::new(PatternDateTimeCodec::default()),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn DateTimeCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn write_records<T, W: SpreadsheetWriter>(
        &self,
        sink: &mut W,
        sheet: &str,
        binding: &RecordBinding<T>,
        records: &[T],
    ) -> Result<WriteSummary, SheetBindError> {
        self.write_rows(
            sink,
            sheet,
            binding.columns(),
            records.len(),
            records.iter().map(|r| binding.values(r)),
        )
    }

    pub fn write_maps<W: SpreadsheetWriter>(
        &self,
        sink: &mut W,
        sheet: &str,
        columns: &[ColumnConfiguration],
        records: &[MapRecord],
    ) -> Result<WriteSummary, SheetBindError> {
        self.write_rows(
            sink,
            sheet,
            columns,
            records.len(),
            records.iter().map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(&c.key).cloned().flatten())
                    .collect()
            }),
        )
    }

    /// `record[i]` is written to `columns[i]`.
    pub fn write_lists<W: SpreadsheetWriter>(
        &self,
        sink: &mut W,
        sheet: &str,
        columns: &[ColumnConfiguration],
        records: &[ListRecord],
    ) -> Result<WriteSummary, SheetBindError> {
        self.write_rows(sink, sheet, columns, records.len(), records.iter().cloned())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn write_rows<W: SpreadsheetWriter>(
        &self,
        sink: &mut W,
        sheet: &str,
        columns: &[ColumnConfiguration],
        count: usize,
        rows: impl Iterator<Item = Vec<Option<TypedValue>>>,
    ) -> Result<WriteSummary, SheetBindError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("write_pass", sheet, rows = count).entered();

        let coercer = Coercer::new(self.codec.as_ref());
        let mut styles = StyleCache::new();
        let mut summary = WriteSummary::default();
        let mut row = self.options.first_row;

        sink.create_sheet(sheet).map_err(SheetBindError::backend)?;

        if self.options.header {
            let style = styles.id(sink, &header_format())?;
            for column in columns {
                let cell = CellData::from_value(column.title.clone()).with_style(style);
                write(sink, sheet, row, column.column_index, cell)?;
            }
            row += 1;
        }

        if self.options.sub_header {
            let style = styles.id(sink, &header_format())?;
            for column in columns {
                let label = column.label.clone().unwrap_or_default();
                let cell = CellData::from_value(label).with_style(style);
                write(sink, sheet, row, column.column_index, cell)?;
            }
            row += 1;
        }

        if self.options.sample_row {
            let format = CellFormat {
                locked: true,
                wrap_text: true,
                number_format: Some("@".to_string()),
                ..CellFormat::default()
            };
            let style = styles.id(sink, &format)?;
            for column in columns {
                let cell = match &column.sample {
                    Some(sample) => CellData::from_value(sample.clone()).with_style(style),
                    None => CellData::styled_blank(style),
                };
                write(sink, sheet, row, column.column_index, cell)?;
            }
            row += 1;
        }

        summary.first_data_row = row;
        for values in rows {
            for (column, value) in columns.iter().zip(values) {
                let value = value.map(|v| column.enum_text(&v).unwrap_or(v));
                let rendered =
                    coercer.write_value(value.as_ref(), column.raw_type, column.precision_digits());
                if let Some(reason) = &rendered.failure {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(row, column = %column.key, reason = %reason, "cell left blank");
                    summary.formatting_failures += 1;
                }
                let mut format = rendered.format;
                format.locked = !column.writable;
                format.wrap_text = true;
                let style = styles.id(sink, &format)?;
                let cell = CellData {
                    value: rendered.value,
                    formula: None,
                    style: Some(style),
                };
                write(sink, sheet, row, column.column_index, cell)?;
            }
            row += 1;
            summary.rows_written += 1;
        }

        for column in columns {
            if !column.display {
                sink.set_column_hidden(sheet, column.column_index, true)
                    .map_err(SheetBindError::backend)?;
                summary.hidden_columns.push(column.column_index);
            }
            if let Some(length) = column.length {
                let width = 2.0 * (length as f64 + 2.0);
                sink.set_column_width(sheet, column.column_index, width)
                    .map_err(SheetBindError::backend)?;
            }
        }

        let annotated_rows = (summary.rows_written as u32).max(self.options.min_annotated_rows);
        if annotated_rows > 0 {
            let last_row = summary.first_data_row + annotated_rows - 1;
            for column in columns {
                let range = CellRange::column(column.column_index, summary.first_data_row, last_row);
                for validation in annotations(column, range) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(column = %column.key, range = %validation.range, "annotation");
                    sink.add_data_validation(sheet, validation)
                        .map_err(SheetBindError::backend)?;
                    summary.annotations += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn write<W: SpreadsheetWriter>(
    sink: &mut W,
    sheet: &str,
    row: u32,
    col: u32,
    cell: CellData,
) -> Result<(), SheetBindError> {
    sink.write_cell(sheet, row, col, cell)
        .map_err(SheetBindError::backend)
}

/// Input restrictions derived from a column's constraints. A multi-value
/// pick list cannot be expressed as a list restriction and stops the scan.
fn annotations(column: &ColumnConfiguration, range: CellRange) -> Vec<DataValidation> {
    let mut out = Vec::new();
    for constraint in &column.constraints {
        let (rule, show_error_box) = match constraint {
            ColumnConstraint::PickList(list) if list.allow_multiple => break,
            ColumnConstraint::PickList(list) => (
                ValidationRule::List {
                    values: list.values.clone(),
                },
                list.must_be_in_range,
            ),
            ColumnConstraint::IntegerRange { min, max } => (
                ValidationRule::IntegerBetween {
                    min: *min,
                    max: *max,
                },
                true,
            ),
            ColumnConstraint::DecimalRange { min, max } => (
                ValidationRule::DecimalBetween {
                    min: *min,
                    max: *max,
                },
                true,
            ),
            _ => continue,
        };
        out.push(DataValidation {
            range,
            rule,
            show_error_box,
            suppress_dropdown_arrow: false,
        });
    }
    out
}
