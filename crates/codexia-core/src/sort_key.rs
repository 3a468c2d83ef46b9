//! Total orders for every entity the pipeline sorts or deduplicates.
//!
//! Every list that leaves the pipeline (issues, drivers, retrieved passages,
//! risk tags) is ordered by one of the comparators below, and nowhere else.
//! Each comparator ends on a text key so that no two distinct entries ever
//! compare equal, which is what makes assessment output byte-stable.
//!
//! # Keys
//!
//! - Issue: `(kind wire name, line, reason)`. Kinds compare by their
//!   snake_case name, so `doc_missing < dx_unspecific < modifier_missing`.
//! - Driver: `(kind priority, line, reason)`, priority per [`DriverKind`].
//! - Scored passage: `(distance, source, clause_id)`. Distances compare with
//!   [`f32::total_cmp`], so equal distances from a flat L2 scan fall through
//!   to the document keys.
//! - Risk contribution: `(contribution descending, feature name)`.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::evidence::{Passage, ScoredPassage};
use crate::issue::{Driver, Issue};

/// Full issue order: kind name, then line, then reason.
pub fn issue_cmp(a: &Issue, b: &Issue) -> Ordering {
    issue_kind_line_cmp(a, b).then_with(|| a.reason.cmp(&b.reason))
}

/// Coarse issue order used by the individual rule engines.
///
/// Not total on its own; engines sort stably with it and
/// [`dedup_issues`] applies the full [`issue_cmp`] afterwards.
pub fn issue_kind_line_cmp(a: &Issue, b: &Issue) -> Ordering {
    a.kind
        .as_str()
        .cmp(b.kind.as_str())
        .then_with(|| a.line.cmp(&b.line))
}

pub fn driver_cmp(a: &Driver, b: &Driver) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| a.line.cmp(&b.line))
        .then_with(|| a.reason.cmp(&b.reason))
}

pub fn scored_passage_cmp(a: &ScoredPassage, b: &ScoredPassage) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.passage.source.cmp(&b.passage.source))
        .then_with(|| a.passage.clause_id.cmp(&b.passage.clause_id))
}

pub fn contribution_cmp(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Drop issues with a repeated `(kind, line, reason)` and sort the rest.
pub fn dedup_issues(issues: impl IntoIterator<Item = Issue>) -> Vec<Issue> {
    let mut seen: HashSet<(crate::IssueKind, usize, String)> = HashSet::new();
    let mut out: Vec<Issue> = issues
        .into_iter()
        .filter(|i| {
            let (kind, line, reason) = i.key();
            seen.insert((kind, line, reason.to_string()))
        })
        .collect();
    out.sort_by(issue_cmp);
    out
}

/// Keep the first occurrence of each `(source, clause_id)`, up to `limit` passages.
///
/// Input order is preserved: callers concatenate query results in priority
/// order and rely on earlier queries winning.
pub fn dedup_passages(passages: impl IntoIterator<Item = Passage>, limit: usize) -> Vec<Passage> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();
    for p in passages {
        if out.len() >= limit {
            break;
        }
        if seen.insert((p.source.clone(), p.clause_id.clone())) {
            out.push(p);
        }
    }
    out
}

/// Rank drivers by [`driver_cmp`] and keep at most `limit`, carrying the source issue along.
pub fn rank_drivers(issues: &[Issue], limit: usize) -> Vec<(Driver, &Issue)> {
    let mut pairs: Vec<(Driver, &Issue)> = issues.iter().map(|i| (Driver::from(i), i)).collect();
    pairs.sort_by(|a, b| driver_cmp(&a.0, &b.0));
    pairs.truncate(limit);
    pairs
}
