//! Process settings shared by the pipeline and the boundary guard.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use codexia_ai::EmbeddingMode;
use codexia_core::RiskWeights;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOPK: usize = 5;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
pub const DEFAULT_RATE_PER_SEC: f64 = 5.0;

/// Where the evidence index lives on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// `index.json` under the vector directory.
    #[default]
    Flat,
    /// Lance table under `<vector dir>/lance` (`lancedb` feature).
    Lance,
}

impl FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "lance" => Ok(Self::Lance),
            other => Err(format!("unknown index backend {other:?} (expected flat or lance)")),
        }
    }
}

impl fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "flat",
            Self::Lance => "lance",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vector_path: PathBuf,
    pub audit_path: PathBuf,
    pub policies_path: PathBuf,
    pub topk: usize,
    pub max_payload_bytes: usize,
    pub rate_per_sec: f64,
    pub embedding: EmbeddingMode,
    pub model_dir: PathBuf,
    pub index_backend: IndexBackend,
    pub risk_weights: RiskWeights,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vector_path: PathBuf::from("./var/vector"),
            audit_path: PathBuf::from("./var/audit"),
            policies_path: PathBuf::from("./data/policies"),
            topk: DEFAULT_TOPK,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            rate_per_sec: DEFAULT_RATE_PER_SEC,
            embedding: EmbeddingMode::Hash,
            model_dir: PathBuf::from("./models/all-MiniLM-L6-v2"),
            index_backend: IndexBackend::Flat,
            risk_weights: RiskWeights::default(),
        }
    }
}

impl Settings {
    pub fn lance_path(&self) -> PathBuf {
        self.vector_path.join("lance")
    }
}
