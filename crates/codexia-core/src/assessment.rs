//! The deterministic half of Assess: issues, risk and ranked drivers.
//!
//! Evidence retrieval needs the index collaborator and lives in the service
//! crate; it consumes [`Findings`] and completes an [`Assessment`].

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::evidence::Evidence;
use crate::issue::{Driver, Issue};
use crate::normalize::normalize_codes;
use crate::risk::{Features, RiskScore, RiskWeights, score_risk};
use crate::sort_key::rank_drivers;
use crate::validate::detect_issues;

/// Drivers kept per assessment.
pub const MAX_DRIVERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub risk: f64,
    pub drivers: Vec<Driver>,
    pub evidence: Vec<Evidence>,
    #[serde(rename = "riskTags", default)]
    pub risk_tags: Vec<String>,
}

/// Everything Assess derives from the claim alone.
#[derive(Debug, Clone)]
pub struct Findings {
    pub normalized: Claim,
    pub issues: Vec<Issue>,
    pub score: RiskScore,
}

impl Findings {
    pub fn analyze(claim: &Claim, weights: &RiskWeights) -> Self {
        let normalized = normalize_codes(claim);
        let issues = detect_issues(&normalized);
        let score = score_risk(&Features::extract(&normalized, &issues), weights);
        Self {
            normalized,
            issues,
            score,
        }
    }

    /// Top drivers in priority order, each with the issue it came from.
    pub fn top_drivers(&self) -> Vec<(Driver, &Issue)> {
        rank_drivers(&self.issues, MAX_DRIVERS)
    }

    pub fn into_assessment(self, evidence: Vec<Evidence>) -> Assessment {
        let drivers = self.top_drivers().into_iter().map(|(d, _)| d).collect();
        Assessment {
            risk: self.score.risk,
            drivers,
            evidence,
            risk_tags: self.score.tags,
        }
    }
}
