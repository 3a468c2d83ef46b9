//! Plan synthesis: one recoding plan and one appeal plan, ranked.

use tracing::debug;

use crate::assessment::Assessment;
use crate::claim::Claim;
use crate::issue::{DriverKind, Issue, IssueKind};
use crate::normalize::normalize_codes;
use crate::plan::{AppealAction, AppealPlan, Plan, PlanResult, RecodingAction, RecodingOp, RecodingPlan};
use crate::rules::DISTINCT_SERVICE_MODIFIER;
use crate::validate::detect_issues;

const RECODING_RATIONALE: &str = "Resolve modifier/document specificity to meet payer policy.";
const APPEAL_RATIONALE: &str = "Argue medical necessity per cited clauses.";
const APPEAL_LEVEL: &str = "L1";

const MAX_RECODING_ACTIONS: usize = 2;
const MAX_APPEAL_CITES: usize = 2;

/// Build both plans for a claim and its assessment.
///
/// Issues are re-derived from the claim. The assessment only contributes the
/// appeal reason (top driver) and citations (leading evidence).
pub fn make_plan(claim: &Claim, assessment: &Assessment) -> PlanResult {
    let normalized = normalize_codes(claim);
    let issues = detect_issues(&normalized);

    let recoding = RecodingPlan {
        actions: suggest_recoding(&issues)
            .into_iter()
            .take(MAX_RECODING_ACTIONS)
            .collect(),
        rationale: RECODING_RATIONALE.into(),
        cite: lead_citation(&issues),
    };

    let reason = assessment
        .drivers
        .first()
        .map_or(DriverKind::Other, |d| d.kind);
    let appeal = AppealPlan {
        actions: vec![AppealAction {
            level: APPEAL_LEVEL.into(),
            reason: reason.as_str().into(),
            cites: assessment
                .evidence
                .iter()
                .take(MAX_APPEAL_CITES)
                .map(|e| e.clause_id.clone())
                .collect(),
        }],
        rationale: APPEAL_RATIONALE.into(),
    };

    let (score_recoding, score_appeal) = plan_scores(&issues);
    debug!(
        claim_id = %claim.claim_id,
        score_recoding,
        score_appeal,
        "ranked plans"
    );
    let plans = if score_appeal > score_recoding {
        vec![Plan::Appeal(appeal), Plan::Recoding(recoding)]
    } else {
        vec![Plan::Recoding(recoding), Plan::Appeal(appeal)]
    };
    PlanResult { plans }
}

/// Recoding actions for every actionable issue: modifier additions first,
/// then diagnosis replacements, each group by line.
pub fn suggest_recoding(issues: &[Issue]) -> Vec<RecodingAction> {
    let mut actions: Vec<RecodingAction> = issues
        .iter()
        .filter_map(|issue| match issue.kind {
            IssueKind::ModifierMissing => Some(RecodingAction {
                line: issue.line,
                op: RecodingOp::AddModifier(DISTINCT_SERVICE_MODIFIER.into()),
                cite: issue.policy_refs.first().cloned(),
            }),
            IssueKind::DxUnspecific => issue.details.as_ref().map(|d| RecodingAction {
                line: issue.line,
                op: RecodingOp::ReplaceDx(d.clone()),
                cite: None,
            }),
            _ => None,
        })
        .collect();
    actions.sort_by_key(|a| (!matches!(a.op, RecodingOp::AddModifier(_)), a.line));
    actions
}

/// Smallest citation of the first issue, in issue order, that carries any.
fn lead_citation(issues: &[Issue]) -> Option<String> {
    issues
        .iter()
        .find_map(|i| i.policy_refs.first())
        .cloned()
}

fn plan_scores(issues: &[Issue]) -> (f64, f64) {
    let has = |kind: IssueKind| issues.iter().any(|i| i.kind == kind);
    let weight = |present: bool, w: f64| if present { w } else { 0.0 };
    let recoding = weight(has(IssueKind::ModifierMissing), 0.15)
        + weight(has(IssueKind::DxUnspecific), 0.10);
    let appeal = weight(has(IssueKind::DocMissing), 0.15)
        + weight(has(IssueKind::DxIncompatibility), 0.10);
    (recoding, appeal)
}
