use std::path::PathBuf;

use codexia_core::{CoreError, IndexError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector index not found in {0}; build it first")]
    IndexNotFound(PathBuf),

    #[error("no policy clauses found under {0}")]
    CorpusEmpty(PathBuf),

    #[error("index was built with embedding model {found:?}, but {expected:?} is configured")]
    ModelMismatch { expected: String, found: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "lancedb")]
    #[error("lancedb error: {0}")]
    Lance(#[from] lancedb::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for IndexError {
    /// Anything that stops an index from loading or answering makes it unavailable.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Index(inner) => inner,
            other => IndexError::Unavailable(other.to_string()),
        }
    }
}
