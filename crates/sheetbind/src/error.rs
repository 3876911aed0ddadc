use sheetbind_spec::ValidationError;
use thiserror::Error;

/// Failures that stop a pass before or outside row processing.
///
/// Bad data is not an error here: it surfaces as
/// [`InvalidRowError`](crate::validate::InvalidRowError) inside a read outcome.
#[derive(Debug, Error)]
pub enum SheetBindError {
    #[error("backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Manifest(#[from] ValidationError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("sheet `{0}` not found")]
    SheetNotFound(String),
}

impl SheetBindError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SheetBindError::Backend {
            source: Box::new(err),
        }
    }
}

/// Configuration defects found while building column bindings.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("column `{key}` has an invalid pattern: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("column `{key}` has no position")]
    MissingPosition { key: String },
    #[error("column key `{0}` is bound twice")]
    DuplicateKey(String),
    #[error("enum column `{0}` lists no values")]
    EmptyEnum(String),
}

/// Failure to move a typed value into or out of a record field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("no enum constant named `{0}`")]
    UnknownConstant(String),
    #[error("record could not be constructed: {0}")]
    Construct(String),
}
