//! Exact nearest-neighbour index over policy passages, persisted as JSON.
//!
//! Search is a brute-force scan returning squared L2 distances. The whole
//! index is immutable once loaded and shared across requests without locks.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use codexia_core::{IndexError, Passage, PassageIndex, ScoredPassage, TextEmbedder, normalize_text};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::StoreError;
use crate::corpus::{corpus_fingerprint, gather_passages};

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    vector_dim: usize,
    model: String,
    /// Corpus fingerprint the index was built from.
    fingerprint: String,
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(
        model: impl Into<String>,
        vector_dim: usize,
        fingerprint: impl Into<String>,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, StoreError> {
        if passages.len() != vectors.len() {
            return Err(StoreError::Other(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != vector_dim) {
            return Err(IndexError::Dimension {
                expected: vector_dim,
                actual: bad.len(),
            }
            .into());
        }
        Ok(Self {
            vector_dim,
            model: model.into(),
            fingerprint: fingerprint.into(),
            passages,
            vectors,
        })
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Write to `dir/index.json` via a temporary file and rename.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::path_in(dir);
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Err(StoreError::IndexNotFound(dir.to_path_buf()));
        }
        let index: Self = serde_json::from_slice(&std::fs::read(&path)?)?;
        Self::new(
            index.model,
            index.vector_dim,
            index.fingerprint,
            index.passages,
            index.vectors,
        )
    }

    /// Load and check the index was built by an embedder like `embedder`.
    pub fn load_for(dir: &Path, embedder: &dyn TextEmbedder) -> Result<Self, StoreError> {
        let index = Self::load(dir)?;
        if index.model != embedder.model() {
            return Err(StoreError::ModelMismatch {
                expected: embedder.model().to_string(),
                found: index.model,
            });
        }
        if index.vector_dim != embedder.dim() {
            return Err(IndexError::Dimension {
                expected: embedder.dim(),
                actual: index.vector_dim,
            }
            .into());
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}

#[async_trait]
impl PassageIndex for FlatIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        if vector.len() != self.vector_dim {
            return Err(IndexError::Dimension {
                expected: self.vector_dim,
                actual: vector.len(),
            });
        }
        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (squared_l2(vector, v), i))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(distance, i)| ScoredPassage {
                distance,
                passage: self.passages[i].clone(),
            })
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildStats {
    pub passages: usize,
    pub skipped: bool,
    pub elapsed_secs: f64,
    pub path: PathBuf,
}

/// Build the flat index for `policies_dir` into `vector_dir`.
///
/// Skips the work when an index built from the same corpus fingerprint with
/// the same embedding model already exists, unless `rebuild` is set.
pub async fn build_index(
    policies_dir: &Path,
    vector_dir: &Path,
    embedder: &dyn TextEmbedder,
    rebuild: bool,
) -> Result<BuildStats, StoreError> {
    let start = Instant::now();
    let fingerprint = corpus_fingerprint(policies_dir)?;

    if !rebuild
        && let Ok(existing) = FlatIndex::load_for(vector_dir, embedder)
        && existing.fingerprint == fingerprint
    {
        info!(dir = %vector_dir.display(), passages = existing.len(), "index up to date");
        return Ok(BuildStats {
            passages: existing.len(),
            skipped: true,
            elapsed_secs: start.elapsed().as_secs_f64(),
            path: FlatIndex::path_in(vector_dir),
        });
    }

    let passages = gather_passages(policies_dir)?;
    if passages.is_empty() {
        return Err(StoreError::CorpusEmpty(policies_dir.to_path_buf()));
    }
    let vectors = embed_passages(&passages, embedder).await?;

    let index = FlatIndex::new(embedder.model(), embedder.dim(), fingerprint, passages, vectors)?;
    let path = index.save(vector_dir)?;
    info!(
        path = %path.display(),
        passages = index.len(),
        model = index.model(),
        "built vector index"
    );
    Ok(BuildStats {
        passages: index.len(),
        skipped: false,
        elapsed_secs: start.elapsed().as_secs_f64(),
        path,
    })
}

/// Embed the normalised text of every passage, in order.
pub async fn embed_passages(
    passages: &[Passage],
    embedder: &dyn TextEmbedder,
) -> Result<Vec<Vec<f32>>, StoreError> {
    let mut vectors = Vec::with_capacity(passages.len());
    for passage in passages {
        vectors.push(embedder.embed(&normalize_text(&passage.text)).await?);
    }
    Ok(vectors)
}
