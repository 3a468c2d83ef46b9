//! Fixed rule tables for the validator and the modifier-pair engine.
//!
//! Synthetic demo rules, not clinical advice.

/// CPT, with an optional HCPCS-style trailing letter.
pub const CPT_PATTERN: &str = r"^[0-9]{5}[A-Z0-9]?$";
/// ICD-10-CM: letter (no U), digit, alphanumeric, optional dotted extension.
pub const ICD10_PATTERN: &str = r"^[A-TV-Z][0-9][A-Z0-9](?:\.[A-Z0-9]{1,4})?$";

/// Two procedures that need a distinct-service modifier when billed together.
#[derive(Debug)]
pub struct ModifierPairRule {
    pub cpts: (&'static str, &'static str),
    pub modifier: &'static str,
    pub why: &'static str,
    pub policy_refs: &'static [&'static str],
}

/// Distinct procedural service.
pub const DISTINCT_SERVICE_MODIFIER: &str = "59";

pub const MODIFIER_PAIRS: &[ModifierPairRule] = &[ModifierPairRule {
    cpts: ("97012", "97110"),
    modifier: DISTINCT_SERVICE_MODIFIER,
    why: "Traction (97012) with therapeutic exercise (97110) on same DOS may need -59.",
    policy_refs: &["UHC-LCD-123 §3b", "Kaiser-ACL-22 §1", "Cigna-MED-77 §2"],
}];

/// Non-specific diagnoses and their site-specific replacements, preferred first.
pub const DX_SPECIFICITY: &[(&str, &[&str])] = &[("M25.50", &["M25.512", "M25.511", "M25.519"])];

pub const DX_SPECIFICITY_REF: &str = "Medicare-AB-2024-05 §4";

/// Documentation requirements attached to a place of service.
#[derive(Debug)]
pub struct SiteRule {
    pub site: &'static str,
    pub notes_required_for: &'static [&'static str],
    pub policy_refs: &'static [&'static str],
}

pub const SITE_RULES: &[SiteRule] = &[SiteRule {
    site: "11",
    notes_required_for: &["imaging_generic"],
    policy_refs: &["BCBS-P123 §7"],
}];

/// A procedure/diagnosis combination the payer will not cover.
#[derive(Debug)]
pub struct IncompatibleRule {
    pub cpt: &'static str,
    pub dx: &'static str,
    pub why: &'static str,
    pub policy_refs: &'static [&'static str],
}

pub const DX_CPT_INCOMPATIBLE: &[IncompatibleRule] = &[IncompatibleRule {
    cpt: "97110",
    dx: "Z00.00",
    why: "Therapeutic exercise not covered for general checkup.",
    policy_refs: &["NCD-001 §1"],
}];

pub fn specificity_candidates(dx: &str) -> Option<&'static [&'static str]> {
    DX_SPECIFICITY
        .iter()
        .find(|(code, _)| *code == dx)
        .map(|(_, candidates)| *candidates)
}

pub fn site_rule(site: &str) -> Option<&'static SiteRule> {
    SITE_RULES.iter().find(|r| r.site == site)
}

pub fn incompatible_rule(cpt: &str, dx: &str) -> Option<&'static IncompatibleRule> {
    DX_CPT_INCOMPATIBLE
        .iter()
        .find(|r| r.cpt == cpt && r.dx == dx)
}
