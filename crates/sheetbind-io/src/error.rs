use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet `{0}` not found")]
    SheetNotFound(String),

    #[error("unknown style id {0}")]
    UnknownStyle(u32),

    #[error("{backend} backend does not support {feature}")]
    Unsupported {
        backend: &'static str,
        feature: &'static str,
    },
}
