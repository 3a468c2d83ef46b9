use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid claim: {0}")]
    Validation(String),

    #[error("no plan provided")]
    NoPlanProvided,

    #[error("serialisation error: {0}")]
    Serialize(#[from] serde_json::Error),
}
