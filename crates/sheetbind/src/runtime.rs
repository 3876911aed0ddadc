use sheetbind_io::{SpreadsheetReader, SpreadsheetWriter};
use sheetbind_spec::Manifest;

use crate::binding::ManifestBindings;
use crate::config::ColumnConfiguration;
use crate::error::SheetBindError;
use crate::reader::{ListRecord, MapRecord, ReadOptions, ReadOutcome, SheetReader};
use crate::writer::{SheetWriter, WriteOptions, WriteSummary};

/// Runtime container that pairs a manifest with a concrete workbook.
pub struct SheetBind<R: SpreadsheetReader> {
    workbook: R,
    bindings: ManifestBindings,
    sheet: String,
}

impl<R: SpreadsheetReader> SheetBind<R> {
    /// Validate and bind the manifest, then resolve the target sheet: the
    /// manifest's sheet, else the workbook's first sheet, else the manifest id.
    pub fn new(workbook: R, manifest: Manifest, locale: Option<&str>) -> Result<Self, SheetBindError> {
        let bindings = ManifestBindings::new(manifest, locale)?;
        let sheet = match bindings.sheet() {
            Some(sheet) => sheet.to_string(),
            None => workbook
                .sheet_names()
                .map_err(SheetBindError::backend)?
                .into_iter()
                .next()
                .unwrap_or_else(|| bindings.manifest().manifest.id.clone()),
        };
        Ok(Self {
            workbook,
            bindings,
            sheet,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Immutable access to the underlying workbook.
    pub fn workbook(&self) -> &R {
        &self.workbook
    }

    /// Mutable access to the underlying workbook.
    pub fn workbook_mut(&mut self) -> &mut R {
        &mut self.workbook
    }

    pub fn manifest(&self) -> &Manifest {
        self.bindings.manifest()
    }

    /// Bound columns in declaration order.
    pub fn columns(&self) -> &[ColumnConfiguration] {
        self.bindings.columns()
    }

    pub fn read_maps(&mut self, options: ReadOptions) -> Result<ReadOutcome<MapRecord>, SheetBindError> {
        let reader = self.reader(options);
        reader.read_maps(&mut self.workbook, &self.sheet, self.bindings.columns())
    }

    pub fn read_lists(
        &mut self,
        options: ReadOptions,
    ) -> Result<ReadOutcome<ListRecord>, SheetBindError> {
        let reader = self.reader(options);
        reader.read_lists(&mut self.workbook, &self.sheet, self.bindings.columns())
    }

    /// Split into workbook and manifest bindings.
    pub fn into_parts(self) -> (R, ManifestBindings) {
        (self.workbook, self.bindings)
    }

    fn reader(&self, mut options: ReadOptions) -> SheetReader {
        if options.locale.is_none() {
            options.locale = self.manifest().manifest.locale.clone();
        }
        SheetReader::new(options)
    }
}

impl<R: SpreadsheetReader + SpreadsheetWriter> SheetBind<R> {
    pub fn write_maps(
        &mut self,
        options: WriteOptions,
        records: &[MapRecord],
    ) -> Result<WriteSummary, SheetBindError> {
        SheetWriter::new(options).write_maps(
            &mut self.workbook,
            &self.sheet,
            self.bindings.columns(),
            records,
        )
    }

    pub fn write_lists(
        &mut self,
        options: WriteOptions,
        records: &[ListRecord],
    ) -> Result<WriteSummary, SheetBindError> {
        SheetWriter::new(options).write_lists(
            &mut self.workbook,
            &self.sheet,
            self.bindings.columns(),
            records,
        )
    }
}
