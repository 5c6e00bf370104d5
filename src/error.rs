//! Error taxonomy shared by every component of the pipeline.
//!
//! One enum, not one type per component — callers match on `CoreError`
//! directly rather than threading component-specific error types through
//! trait boundaries.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("invalid extraction params ({params}): {reason}")]
    ExtractionError { params: String, reason: String },

    #[error("embedding backend error: {reason} (retryable={retryable})")]
    EmbeddingBackendError { reason: String, retryable: bool },

    #[error("vector store error: {reason}")]
    StoreError { reason: String },

    #[error("model mismatch: expected {expected}, store has {actual}")]
    ModelMismatch { expected: String, actual: String },

    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("protocol error {code}: {message}")]
    ProtocolError { code: i64, message: String },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io { path: path.into(), source }
    }

    /// Stable string tag used in JSON-RPC `status.code` fields and logs.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Io { .. } => "io",
            CoreError::ParseError { .. } => "parse_error",
            CoreError::ExtractionError { .. } => "extraction_error",
            CoreError::EmbeddingBackendError { .. } => "embedding_backend_error",
            CoreError::StoreError { .. } => "store_error",
            CoreError::ModelMismatch { .. } => "model_mismatch",
            CoreError::InvalidArgument { .. } => "invalid_argument",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Timeout => "timeout",
            CoreError::Cancelled => "cancelled",
            CoreError::ProtocolError { .. } => "protocol_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
