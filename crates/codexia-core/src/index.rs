//! Collaborator interfaces for evidence retrieval.
//!
//! Embedding and nearest-neighbour search are black boxes to the pipeline.
//! Implementations live in `codexia-ai` (embedders) and `codexia-store`
//! (indexes).

use async_trait::async_trait;
use thiserror::Error;

use crate::evidence::ScoredPassage;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The index is missing, unreadable or built for another embedding model.
    #[error("index unavailable: {0}")]
    Unavailable(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// `embed(text) -> vector`
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Identifier recorded alongside an index, e.g. `hash-bow-384`.
    fn model(&self) -> &str;

    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

/// `search(vector, k) -> ranked (distance, passage) list`
///
/// Results are nearest first. Equal distances may come back in any order;
/// callers impose the total order.
#[async_trait]
pub trait PassageIndex: Send + Sync {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError>;
}
