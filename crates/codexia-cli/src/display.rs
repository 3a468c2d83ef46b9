//! Vertical card display for an assessment.
//!
//! Renders the claim header, risk, drivers and evidence as grouped,
//! human-readable sections. Sections with nothing to show are skipped.

use std::fmt::Write;

use codexia_core::actor::shorten;
use codexia_core::{Assessment, Claim};

const MAX_LIST_ITEMS: usize = 10;
const PASSAGE_WIDTH: usize = 72;
const RISK_BAR_WIDTH: usize = 20;

// ── Public API ──

pub fn print_assessment_card(claim: &Claim, assessment: &Assessment) {
    print!("{}", render_assessment_card(claim, assessment));
}

pub fn render_assessment_card(claim: &Claim, assessment: &Assessment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", claim.claim_id);
    if !claim.payer.name.is_empty() {
        let _ = writeln!(out, "{}", claim.payer.name);
    }
    let _ = writeln!(out);

    claim_section(&mut out, claim);
    risk_section(&mut out, assessment);
    drivers_section(&mut out, assessment);
    evidence_section(&mut out, assessment);
    out
}

// ── Section rendering ──

fn claim_section(out: &mut String, claim: &Claim) {
    let _ = writeln!(out, "Claim");
    field(out, "plan", &claim.payer.plan_id);
    field(out, "state", &claim.payer.state);
    field(out, "site_of_service", claim.site_of_service().unwrap_or(""));
    let _ = writeln!(out, "  lines ({}):", claim.lines.len());
    for (i, line) in claim.lines.iter().take(MAX_LIST_ITEMS).enumerate() {
        let _ = write!(out, "    {i:<3} {:<8}", line.cpt);
        let dx: Vec<&str> = line.dx.iter().map(String::as_str).collect();
        if !dx.is_empty() {
            let _ = write!(out, "  dx: {}", dx.join(", "));
        }
        let modifiers: Vec<&str> = line
            .modifiers
            .iter()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect();
        if !modifiers.is_empty() {
            let _ = write!(out, "  mod: {}", modifiers.join(", "));
        }
        let _ = writeln!(out);
    }
    more(out, claim.lines.len());
    let _ = writeln!(out);
}

fn risk_section(out: &mut String, assessment: &Assessment) {
    let _ = writeln!(out, "Risk");
    let filled = (assessment.risk.clamp(0.0, 1.0) * RISK_BAR_WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(RISK_BAR_WIDTH - filled));
    let _ = writeln!(out, "  {:<26} {:.2} [{bar}]", "score", assessment.risk);
    field(out, "tags", &assessment.risk_tags.join(", "));
    let _ = writeln!(out);
}

fn drivers_section(out: &mut String, assessment: &Assessment) {
    if assessment.drivers.is_empty() {
        return;
    }
    let _ = writeln!(out, "Drivers ({}):", assessment.drivers.len());
    for driver in &assessment.drivers {
        let _ = writeln!(
            out,
            "    line {:<3} {:<20} {}",
            driver.line,
            driver.kind.as_str(),
            driver.reason
        );
    }
    let _ = writeln!(out);
}

fn evidence_section(out: &mut String, assessment: &Assessment) {
    let evidence = &assessment.evidence;
    if evidence.is_empty() {
        return;
    }
    let _ = writeln!(out, "Evidence ({}):", evidence.len());
    for e in evidence.iter().take(MAX_LIST_ITEMS) {
        let _ = write!(out, "    {:<30}  {}", e.clause_id, e.source);
        match &e.effective.to {
            Some(to) => {
                let _ = writeln!(out, "  {} → {}", e.effective.from, to);
            }
            None => {
                let _ = writeln!(out, "  from {}", e.effective.from);
            }
        }
        let _ = writeln!(out, "      {}", shorten(&e.passage, PASSAGE_WIDTH, "..."));
    }
    more(out, evidence.len());
    let _ = writeln!(out);
}

// ── Helpers ──

fn field(out: &mut String, name: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "  {name:<26} {value}");
    }
}

fn more(out: &mut String, len: usize) {
    if len > MAX_LIST_ITEMS {
        let _ = writeln!(out, "    ... and {} more", len - MAX_LIST_ITEMS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codexia_core::evidence::EffectiveRange;
    use codexia_core::{Driver, DriverKind, Evidence};

    fn claim() -> Claim {
        serde_json::from_str(
            r#"{"claimId": "CLM-9", "payer": {"name": "Aetna", "state": "NY"},
                "provider": {"siteOfService": "11"},
                "lines": [{"cpt": "97012", "dx": ["M25.50"], "modifiers": ["", "GP"]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn card_has_every_section() {
        let assessment = Assessment {
            risk: 0.49,
            drivers: vec![Driver {
                line: 0,
                kind: DriverKind::ModifierMissing,
                reason: "needs 59".into(),
            }],
            evidence: vec![Evidence {
                source: "uhc.md".into(),
                clause_id: "UHC-LCD-123 §3b".into(),
                passage: "word ".repeat(40),
                effective: EffectiveRange {
                    from: "2024-01-01".into(),
                    to: None,
                },
            }],
            risk_tags: vec!["modifier_missing".into(), "lines".into()],
        };
        let card = render_assessment_card(&claim(), &assessment);

        assert!(card.starts_with("=== CLM-9 ===\nAetna\n"));
        assert!(card.contains("mod: GP"));
        assert!(card.contains("0.49 [##########..........]"));
        assert!(card.contains("modifier_missing, lines"));
        assert!(card.contains("line 0   modifier_missing"));
        assert!(card.contains("from 2024-01-01"));
        assert!(card.lines().all(|l| l.chars().count() <= 80), "{card}");
    }

    #[test]
    fn empty_sections_are_skipped() {
        let assessment = Assessment {
            risk: 0.0,
            drivers: Vec::new(),
            evidence: Vec::new(),
            risk_tags: Vec::new(),
        };
        let card = render_assessment_card(&claim(), &assessment);
        assert!(!card.contains("Drivers"));
        assert!(!card.contains("Evidence"));
        assert!(!card.contains("tags"));
    }
}
