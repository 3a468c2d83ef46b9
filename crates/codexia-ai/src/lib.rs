//! Embedding implementations behind [`codexia_core::TextEmbedder`].

mod hash;
mod mode;

pub use hash::{DEFAULT_DIM, HashEmbedder};
pub use mode::{EmbeddingMode, load_embedder};

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::{MODEL_NAME as ONNX_MODEL_NAME, OnnxEmbedder};
