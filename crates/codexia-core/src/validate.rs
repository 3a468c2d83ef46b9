//! Per-line code validation: formats, diagnosis specificity, diagnosis
//! compatibility and site-of-service documentation.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::claim::{Claim, ClaimLine};
use crate::issue::{CodeSuggestion, Issue, IssueKind};
use crate::modifiers::modifier_rules;
use crate::normalize::normalize_codes;
use crate::rules::{self, SiteRule};
use crate::sort_key::{dedup_issues, issue_kind_line_cmp};

static CPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(rules::CPT_PATTERN).expect("valid cpt regex"));
static ICD10_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(rules::ICD10_PATTERN).expect("valid icd10 regex"));

/// Validate every line of the claim.
///
/// Never fails: unparseable codes become `format_error` issues. The claim is
/// normalised first, so raw input is fine. Output is sorted by `(kind, line)`.
pub fn validate_codes(claim: &Claim) -> Vec<Issue> {
    let claim = normalize_codes(claim);
    let site = claim.site_of_service().and_then(rules::site_rule);
    let mut issues = Vec::new();

    for (idx, line) in claim.lines.iter().enumerate() {
        check_formats(idx, line, &mut issues);
        check_specificity(idx, line, &mut issues);
        check_compatibility(idx, line, &mut issues);
        if let Some(rule) = site {
            check_site_documentation(idx, line, rule, &mut issues);
        }
    }

    issues.sort_by(issue_kind_line_cmp);
    issues
}

/// Run the validator and the modifier-pair engine, then deduplicate.
pub fn detect_issues(claim: &Claim) -> Vec<Issue> {
    let issues = dedup_issues(validate_codes(claim).into_iter().chain(modifier_rules(claim)));
    debug!(claim_id = %claim.claim_id, issues = issues.len(), "detected issues");
    issues
}

fn check_formats(idx: usize, line: &ClaimLine, issues: &mut Vec<Issue>) {
    if !CPT_RE.is_match(&line.cpt) {
        issues.push(Issue::new(idx, IssueKind::FormatError, format!("Bad CPT {}", line.cpt)));
    }
    for dx in &line.dx {
        if !ICD10_RE.is_match(dx) {
            issues.push(Issue::new(idx, IssueKind::FormatError, format!("Bad ICD {dx}")));
        }
    }
}

/// At most one `dx_unspecific` per line: the first qualifying diagnosis wins.
fn check_specificity(idx: usize, line: &ClaimLine, issues: &mut Vec<Issue>) {
    let hit = line
        .dx
        .iter()
        .find_map(|dx| rules::specificity_candidates(dx).map(|c| (dx, c)));
    if let Some((dx, candidates)) = hit
        && let Some(to) = candidates.first()
    {
        issues.push(
            Issue::new(
                idx,
                IssueKind::DxUnspecific,
                format!("{dx} is non-specific; consider site-specific alternative."),
            )
            .with_details(CodeSuggestion {
                from: dx.clone(),
                to: (*to).to_string(),
            })
            .with_refs([rules::DX_SPECIFICITY_REF]),
        );
    }
}

fn check_compatibility(idx: usize, line: &ClaimLine, issues: &mut Vec<Issue>) {
    for dx in &line.dx {
        if let Some(rule) = rules::incompatible_rule(&line.cpt, dx) {
            issues.push(
                Issue::new(idx, IssueKind::DxIncompatibility, rule.why)
                    .with_refs(rule.policy_refs.iter().copied()),
            );
        }
    }
}

fn check_site_documentation(
    idx: usize,
    line: &ClaimLine,
    rule: &SiteRule,
    issues: &mut Vec<Issue>,
) {
    let flags = line.details.as_ref().map(|d| d.flags()).unwrap_or_default();
    if flags
        .iter()
        .any(|f| rule.notes_required_for.contains(&f.as_str()))
    {
        issues.push(
            Issue::new(
                idx,
                IssueKind::DocMissing,
                format!("POS {} requires documented rationale for imaging.", rule.site),
            )
            .with_refs(rule.policy_refs.iter().copied()),
        );
    }
}
