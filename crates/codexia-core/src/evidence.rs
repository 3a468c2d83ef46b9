//! Policy passages and the evidence projection handed to clients.

use serde::{Deserialize, Serialize};

/// One clause of a policy document, as stored in the corpus index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    /// Source document file name.
    pub source: String,
    /// e.g. `UHC-LCD-123 §3b`
    pub clause_id: String,
    /// `YYYY-MM-DD`
    pub effective_from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<String>,
}

impl Passage {
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.clause_id)
    }
}

/// A passage with its distance from the query vector (smaller is closer).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub distance: f32,
    pub passage: Passage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRange {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    #[serde(rename = "clauseId")]
    pub clause_id: String,
    pub passage: String,
    pub effective: EffectiveRange,
}

impl From<Passage> for Evidence {
    fn from(p: Passage) -> Self {
        Self {
            source: p.source,
            clause_id: p.clause_id,
            passage: p.text,
            effective: EffectiveRange {
                from: p.effective_from,
                to: p.effective_to,
            },
        }
    }
}
