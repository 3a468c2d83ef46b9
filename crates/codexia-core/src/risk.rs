//! Weighted risk score over issue-derived features.

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::issue::{Issue, IssueKind};
use crate::sort_key::contribution_cmp;

/// Lines beyond this count no longer raise the `lines` feature.
const LINES_CAP: usize = 5;

/// Per-feature weights. Missing keys in configuration fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskWeights {
    pub modifier_missing: f64,
    pub dx_unspecific: f64,
    pub doc_missing: f64,
    pub dx_incompatibility: f64,
    pub lines: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            modifier_missing: 0.30,
            dx_unspecific: 0.15,
            doc_missing: 0.20,
            dx_incompatibility: 0.25,
            lines: 0.10,
        }
    }
}

impl RiskWeights {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("modifier_missing", self.modifier_missing),
            ("dx_unspecific", self.dx_unspecific),
            ("doc_missing", self.doc_missing),
            ("dx_incompatibility", self.dx_incompatibility),
            ("lines", self.lines),
        ]
    }
}

/// Feature vector: presence flags per issue kind plus a normalised line count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Features {
    pub modifier_missing: f64,
    pub dx_unspecific: f64,
    pub doc_missing: f64,
    pub dx_incompatibility: f64,
    /// `min(lines, 5) / 5`
    pub lines: f64,
}

impl Features {
    /// Extract features from a claim and its deduplicated issues.
    pub fn extract(claim: &Claim, issues: &[Issue]) -> Self {
        let has = |kind: IssueKind| {
            if issues.iter().any(|i| i.kind == kind) {
                1.0
            } else {
                0.0
            }
        };
        Self {
            modifier_missing: has(IssueKind::ModifierMissing),
            dx_unspecific: has(IssueKind::DxUnspecific),
            doc_missing: has(IssueKind::DocMissing),
            dx_incompatibility: has(IssueKind::DxIncompatibility),
            lines: claim.lines.len().min(LINES_CAP) as f64 / LINES_CAP as f64,
        }
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("modifier_missing", self.modifier_missing),
            ("dx_unspecific", self.dx_unspecific),
            ("doc_missing", self.doc_missing),
            ("dx_incompatibility", self.dx_incompatibility),
            ("lines", self.lines),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskScore {
    /// Always within `[0, 1]`.
    pub risk: f64,
    /// Features with a positive contribution, largest first, ties by name.
    pub tags: Vec<String>,
}

pub fn score_risk(features: &Features, weights: &RiskWeights) -> RiskScore {
    let mut raw = 0.0;
    let mut contributions: Vec<(&str, f64)> = Vec::new();
    for ((name, value), (_, weight)) in features.named().into_iter().zip(weights.named()) {
        let contribution = value * weight;
        raw += contribution;
        if contribution > 0.0 {
            contributions.push((name, contribution));
        }
    }
    contributions.sort_by(contribution_cmp);

    RiskScore {
        risk: raw.clamp(0.0, 1.0),
        tags: contributions
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect(),
    }
}
