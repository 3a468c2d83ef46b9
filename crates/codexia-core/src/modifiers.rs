//! CPT pairs that need a distinct-procedural-service modifier.

use crate::claim::Claim;
use crate::issue::{Issue, IssueKind};
use crate::normalize::normalize_codes;
use crate::rules::MODIFIER_PAIRS;
use crate::sort_key::issue_kind_line_cmp;

/// One `modifier_missing` issue per table pair that is billed without its modifier.
///
/// The issue lands on whichever code of the pair appears first in the claim.
/// Any line carrying the modifier satisfies the pair.
pub fn modifier_rules(claim: &Claim) -> Vec<Issue> {
    let claim = normalize_codes(claim);
    let cpts = claim.cpts();
    let mut issues = Vec::new();

    for rule in MODIFIER_PAIRS {
        let (a, b) = rule.cpts;
        let (Some(idx_a), Some(idx_b)) = (
            cpts.iter().position(|c| *c == a),
            cpts.iter().position(|c| *c == b),
        ) else {
            continue;
        };
        let has_modifier = claim
            .lines
            .iter()
            .any(|l| l.modifiers.iter().any(|m| m == rule.modifier));
        if !has_modifier {
            issues.push(
                Issue::new(idx_a.min(idx_b), IssueKind::ModifierMissing, rule.why)
                    .with_refs(rule.policy_refs.iter().copied()),
            );
        }
    }

    issues.sort_by(issue_kind_line_cmp);
    issues
}
