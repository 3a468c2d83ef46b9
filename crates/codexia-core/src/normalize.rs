//! Code and text normalisation shared by every pipeline stage.

use crate::claim::Claim;

/// Return a copy of the claim with diagnosis and modifier codes upper-cased,
/// trimmed, and empty entries dropped.
pub fn normalize_codes(claim: &Claim) -> Claim {
    let mut out = claim.clone();
    for line in &mut out.lines {
        line.dx = clean_codes(&line.dx);
        line.modifiers = clean_codes(&line.modifiers);
    }
    out
}

fn clean_codes(codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Canonical form of text before it is embedded.
///
/// Lower-cases, replaces everything outside `[a-z0-9]`, whitespace and
/// `- _ / . : ( ) §` with a space, collapses whitespace runs and trims.
/// The corpus indexer and the query side must both go through this function.
pub fn normalize_text(s: &str) -> String {
    let lowered = s.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_digit()
        || c.is_whitespace()
        || matches!(c, '-' | '_' | '/' | '.' | ':' | '(' | ')' | '§')
}
