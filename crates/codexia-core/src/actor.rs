//! Act: apply the selected plan and stamp the result with content hashes.

use std::collections::HashSet;

use tracing::info;

use crate::CoreError;
use crate::artifact::{AppealLetter, AppliedActions, Artifact, ArtifactMeta, ArtifactPayload, ArtifactType};
use crate::canonical::canonical_sha256;
use crate::claim::Claim;
use crate::evidence::Evidence;
use crate::plan::{AppealPlan, Plan, PlanKind, PlanResult, RecodingAction, RecodingOp};

const LETTER_PASSAGES: usize = 3;
const BULLET_WIDTH: usize = 120;
const ELLIPSIS: &str = "…";
const DEFAULT_DENIAL_REASON: &str = "appeal";

/// Apply a plan to the claim and return the artifact.
///
/// A recoding plan is preferred wherever it sits in the list, otherwise the
/// first plan is used. `evidence` only matters for appeal letters.
pub fn act_on_plan(
    claim: &Claim,
    plans: &PlanResult,
    evidence: &[Evidence],
) -> Result<Artifact, CoreError> {
    let chosen = plans
        .plans
        .iter()
        .find(|p| p.kind() == PlanKind::Recoding)
        .or_else(|| plans.plans.first())
        .ok_or(CoreError::NoPlanProvided)?;

    let input_sha256 = canonical_sha256(claim)?;
    let artifact = match chosen {
        Plan::Recoding(plan) => {
            let corrected = apply_recoding(claim, &plan.actions)?;
            Artifact {
                artifact_type: ArtifactType::CorrectedClaim,
                meta: ArtifactMeta {
                    input_sha256,
                    output_sha256: canonical_sha256(&corrected)?,
                    actions: AppliedActions::Recoding(plan.actions.clone()),
                    plan_type: PlanKind::Recoding,
                },
                payload: ArtifactPayload::CorrectedClaim(corrected),
            }
        }
        Plan::Appeal(plan) => {
            let letter = appeal_letter(claim, &denial_reason(plan), evidence);
            Artifact {
                artifact_type: ArtifactType::AppealLetter,
                meta: ArtifactMeta {
                    input_sha256,
                    output_sha256: canonical_sha256(&letter)?,
                    actions: AppliedActions::Appeal(plan.actions.clone()),
                    plan_type: PlanKind::Appeal,
                },
                payload: ArtifactPayload::AppealLetter(letter),
            }
        }
    };

    info!(
        claim_id = %claim.claim_id,
        plan_type = %artifact.meta.plan_type,
        output_sha256 = %artifact.meta.output_sha256,
        "artifact created"
    );
    Ok(artifact)
}

/// Apply recoding actions to a copy of the claim, then clean every line's
/// modifiers (upper-case, trimmed, no empties, first occurrence kept).
pub fn apply_recoding(claim: &Claim, actions: &[RecodingAction]) -> Result<Claim, CoreError> {
    let mut out = claim.clone();
    let line_count = out.lines.len();
    for action in actions {
        let line = out.lines.get_mut(action.line).ok_or_else(|| {
            CoreError::Validation(format!(
                "action targets line {} but the claim has {line_count} lines",
                action.line
            ))
        })?;
        match &action.op {
            RecodingOp::AddModifier(modifier) => {
                let modifier = modifier.trim().to_uppercase();
                if !modifier.is_empty() && !line.modifiers.contains(&modifier) {
                    line.modifiers.push(modifier);
                }
            }
            RecodingOp::ReplaceDx(swap) => {
                let from = swap.from.to_uppercase();
                let to = swap.to.to_uppercase();
                for dx in &mut line.dx {
                    if dx.to_uppercase() == from {
                        dx.clone_from(&to);
                    }
                }
            }
        }
    }
    for line in &mut out.lines {
        let mut seen = HashSet::new();
        line.modifiers = line
            .modifiers
            .iter()
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty() && seen.insert(m.clone()))
            .collect();
    }
    Ok(out)
}

fn denial_reason(plan: &AppealPlan) -> String {
    let reason = plan
        .actions
        .iter()
        .map(|a| a.reason.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    if reason.is_empty() {
        DEFAULT_DENIAL_REASON.into()
    } else {
        reason
    }
}

/// Render the level-1 appeal letter. Output depends only on the inputs.
pub fn appeal_letter(claim: &Claim, denial_reason: &str, evidence: &[Evidence]) -> AppealLetter {
    let passages = &evidence[..evidence.len().min(LETTER_PASSAGES)];
    let bullets: Vec<String> = passages
        .iter()
        .map(|e| {
            format!(
                "- **{}**: {}",
                e.clause_id,
                shorten(&e.passage, BULLET_WIDTH, ELLIPSIS)
            )
        })
        .collect();
    let claim_id = &claim.claim_id;
    let payer = if claim.payer.name.is_empty() {
        "Payer"
    } else {
        claim.payer.name.as_str()
    };

    let markdown = format!(
        "# Level-1 Appeal — {claim_id}\n\n\
         **To:** {payer}  \n\
         **Subject:** Reconsideration Request — Denial (“{denial_reason}”)\n\n\
         We request reconsideration for claim **{claim_id}**. The submitted services are \
         supported by documentation and applicable policy guidance:\n\n\
         {}\n\n\
         **Requested Action:** Reverse the denial and reprocess the claim in accordance \
         with the cited clauses.\n\n\
         Sincerely,\nRevenue Integrity Team",
        bullets.join("\n")
    );

    AppealLetter {
        markdown: markdown.trim().to_string(),
        cites: passages
            .iter()
            .filter(|e| !e.clause_id.is_empty())
            .map(|e| e.clause_id.clone())
            .collect(),
    }
}

/// Collapse whitespace and, if the result is wider than `width` characters,
/// keep as many whole words as fit alongside `placeholder`.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut len = 0;
    for word in &words {
        let extra = word.chars().count() + usize::from(!kept.is_empty());
        if len + extra > width {
            break;
        }
        kept.push(word);
        len += extra;
    }
    let placeholder_len = placeholder.chars().count();
    while let Some(last) = kept.last() {
        if len + placeholder_len <= width {
            break;
        }
        len -= last.chars().count() + usize::from(kept.len() > 1);
        kept.pop();
    }
    if kept.is_empty() {
        return placeholder.trim_start().to_string();
    }
    format!("{}{placeholder}", kept.join(" "))
}
