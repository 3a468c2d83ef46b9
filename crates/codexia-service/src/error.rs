use codexia_core::{CoreError, IndexError};
use codexia_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("rate limit exceeded for client {client}")]
    RateLimited { client: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no plan provided")]
    NoPlanProvided,

    #[error("evidence index unavailable: {0}")]
    IndexUnavailable(#[from] IndexError),

    #[error("audit write failed: {0}")]
    Audit(#[source] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP-equivalent status for the request edge.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } => 413,
            Self::RateLimited { .. } => 429,
            Self::Validation(_) | Self::NoPlanProvided => 400,
            Self::IndexUnavailable(_) => 503,
            Self::Audit(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::NoPlanProvided => Self::NoPlanProvided,
            CoreError::Serialize(e) => Self::Internal(format!("serialize: {e}")),
        }
    }
}
