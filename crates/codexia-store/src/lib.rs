//! Storage layer: policy corpus ingestion, vector indexes and the audit log.

mod error;
pub use error::StoreError;

pub mod audit;
pub mod corpus;
pub mod flat;

pub use audit::{AuditLog, AuditRecord};
pub use corpus::{corpus_fingerprint, extract_clauses, gather_passages};
pub use flat::{BuildStats, FlatIndex, build_index, embed_passages};

#[cfg(feature = "lancedb")]
mod lance;
#[cfg(feature = "lancedb")]
pub use lance::LanceIndex;
