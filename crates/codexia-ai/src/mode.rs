//! Embedding implementation selected by configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use codexia_core::TextEmbedder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::HashEmbedder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Token-hash bag of words. No model files needed.
    #[default]
    Hash,
    /// Sentence-transformers model via ONNX Runtime (`onnx` feature).
    Onnx,
}

impl FromStr for EmbeddingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "onnx" => Ok(Self::Onnx),
            other => Err(format!("unknown embedding mode {other:?} (expected hash or onnx)")),
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hash => "hash",
            Self::Onnx => "onnx",
        })
    }
}

/// Construct the embedder for `mode`.
///
/// Selecting `onnx` when the model cannot be loaded is an error; there is no
/// fallback to hashing.
pub fn load_embedder(mode: EmbeddingMode, model_dir: &Path) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    let embedder: Arc<dyn TextEmbedder> = match mode {
        EmbeddingMode::Hash => Arc::new(HashEmbedder::default()),
        EmbeddingMode::Onnx => load_onnx(model_dir)?,
    };
    info!(%mode, model = embedder.model(), dim = embedder.dim(), "embedder ready");
    Ok(embedder)
}

#[cfg(feature = "onnx")]
fn load_onnx(model_dir: &Path) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    Ok(Arc::new(crate::OnnxEmbedder::load(model_dir)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(model_dir: &Path) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    anyhow::bail!(
        "embedding mode onnx requested (model dir {model_dir:?}) but this build lacks the `onnx` feature"
    )
}
