//! Narrow source/sink boundary between the binding engine and a concrete
//! tabular storage format.
//!
//! Coordinates are zero-based `(row, col)` throughout.

pub mod backends;
pub mod error;
pub mod traits;

#[cfg(feature = "json")]
pub use backends::JsonAdapter;
pub use error::IoError;
pub use traits::{
    BackendCaps, CellData, CellFormat, DataValidation, HorizontalAlign, SheetData,
    SpreadsheetIO, SpreadsheetReader, SpreadsheetWriter, StyleId, ValidationRule,
};

// Re-export for convenience
pub use sheetbind_common::{CellKind, CellRange, CellValue};
