//! Artifacts produced by Act.

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::plan::{AppealAction, PlanKind, RecodingAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    CorrectedClaim,
    AppealLetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "artifactType")]
    pub artifact_type: ArtifactType,
    pub payload: ArtifactPayload,
    pub meta: ArtifactMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactPayload {
    CorrectedClaim(Claim),
    AppealLetter(AppealLetter),
}

/// Markdown appeal letter and the clause ids it cites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealLetter {
    pub markdown: String,
    pub cites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub input_sha256: String,
    pub output_sha256: String,
    pub actions: AppliedActions,
    pub plan_type: PlanKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppliedActions {
    Recoding(Vec<RecodingAction>),
    Appeal(Vec<AppealAction>),
}

/// Artifact type and metadata, without the payload. This is what the audit
/// log records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    #[serde(rename = "artifactType")]
    pub artifact_type: ArtifactType,
    pub meta: ArtifactMeta,
}

impl Artifact {
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            artifact_type: self.artifact_type,
            meta: self.meta.clone(),
        }
    }

    pub fn corrected_claim(&self) -> Option<&Claim> {
        match &self.payload {
            ArtifactPayload::CorrectedClaim(c) => Some(c),
            ArtifactPayload::AppealLetter(_) => None,
        }
    }

    pub fn appeal_letter(&self) -> Option<&AppealLetter> {
        match &self.payload {
            ArtifactPayload::AppealLetter(l) => Some(l),
            ArtifactPayload::CorrectedClaim(_) => None,
        }
    }
}
