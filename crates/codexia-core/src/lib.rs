pub mod actor;
pub mod artifact;
pub mod assessment;
pub mod canonical;
pub mod claim;
pub mod error;
pub mod evidence;
pub mod index;
pub mod issue;
pub mod modifiers;
pub mod normalize;
pub mod plan;
pub mod planner;
pub mod risk;
pub mod rules;
pub mod schema;
pub mod sort_key;
pub mod validate;

pub use actor::act_on_plan;
pub use artifact::{AppealLetter, Artifact, ArtifactSummary, ArtifactType};
pub use assessment::{Assessment, Findings};
pub use canonical::{canonical_json, canonical_sha256, sha256_hex};
pub use claim::{Claim, ClaimLine};
pub use error::CoreError;
pub use evidence::{Evidence, Passage, ScoredPassage};
pub use index::{IndexError, PassageIndex, TextEmbedder};
pub use issue::{Driver, DriverKind, Issue, IssueKind};
pub use normalize::{normalize_codes, normalize_text};
pub use plan::{Plan, PlanKind, PlanResult};
pub use planner::make_plan;
pub use risk::RiskWeights;
pub use schema::passages;
pub use validate::detect_issues;
