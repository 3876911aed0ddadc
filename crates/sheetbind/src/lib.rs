//! Column-configuration-driven binding between spreadsheet rows and records.
//!
//! A list of [`ColumnConfiguration`]s describes where each column sits, which
//! [`TargetType`] its cells coerce to, and which [`ColumnConstraint`]s a value
//! must satisfy. [`SheetReader`] turns rows into list, map, or typed records
//! and stops at the first invalid row; [`SheetWriter`] turns records back into
//! formatted cells with input annotations. Column sets can be declared in code,
//! through a [`RecordBinding`], or in a [`sheetbind_spec::Manifest`].

pub mod binding;
pub mod coerce;
pub mod config;
pub mod constraint;
pub mod datetime;
pub mod error;
pub mod message;
pub mod reader;
pub mod record;
mod runtime;
pub mod validate;
pub mod value;
pub mod writer;

pub use binding::{ManifestBindings, bind_column, bind_manifest};
pub use coerce::{Coercer, RenderedCell};
pub use config::{ColumnConfiguration, RawType};
pub use constraint::{CheckedValue, ColumnConstraint, PatternRule, PickList, UniqueTracker};
pub use datetime::{DateTimeCodec, PatternDateTimeCodec};
pub use error::{BindingError, FieldError, SheetBindError};
pub use message::{DefaultCatalog, MapCatalog, MessageCatalog};
pub use reader::{ListRecord, MapRecord, ReadOptions, ReadOutcome, SheetReader};
pub use record::{CellField, ConfigurationCache, RecordBinding, RecordBindingBuilder, SheetRecord};
pub use runtime::SheetBind;
pub use validate::{
    BindingConstraintValidator, CellAddressing, CellLocator, FieldViolation, InvalidCellError,
    InvalidRowError, RecordValidator, RowValidator,
};
pub use value::{CellEnum, EnumConstant, EnumDescriptor, Money, TargetType, TypedValue};
pub use writer::{SheetWriter, StyleCache, WriteOptions, WriteSummary};
