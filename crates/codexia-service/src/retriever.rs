//! Evidence retrieval: one context query plus one query per top driver.
//!
//! Results are concatenated in query order, deduplicated by
//! `(source, clause_id)` and truncated to `topk`. Any index failure is
//! returned to the caller; an unavailable index never reads as "no evidence".

use std::sync::Arc;

use codexia_core::sort_key::{dedup_passages, scored_passage_cmp};
use codexia_core::{
    Claim, Driver, DriverKind, Evidence, Findings, IndexError, Issue, Passage, PassageIndex,
    TextEmbedder, normalize_text,
};
use tracing::debug;

const MODIFIER_QUERY: &str = "modifier 59";
const INCOMPATIBILITY_QUERY: &str = "dx incompatibility";

pub struct Retriever {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn PassageIndex>,
    topk: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn TextEmbedder>, index: Arc<dyn PassageIndex>, topk: usize) -> Self {
        Self {
            embedder,
            index,
            topk,
        }
    }

    pub fn topk(&self) -> usize {
        self.topk
    }

    pub fn embedder(&self) -> &dyn TextEmbedder {
        self.embedder.as_ref()
    }

    /// Up to `topk` passages for one query, ranked by distance then `(source, clause_id)`.
    pub async fn search(&self, query: &str) -> Result<Vec<Passage>, IndexError> {
        let vector = self.embedder.embed(&normalize_text(query)).await?;
        let mut hits = self.index.search(&vector, self.topk.max(1)).await?;
        hits.sort_by(scored_passage_cmp);
        hits.truncate(self.topk);
        debug!(query_len = query.len(), hits = hits.len(), "semantic search");
        Ok(hits.into_iter().map(|h| h.passage).collect())
    }

    /// Evidence for an analysed claim: context query first, then each top driver.
    pub async fn evidence_for(&self, findings: &Findings) -> Result<Vec<Evidence>, IndexError> {
        let claim = &findings.normalized;
        let mut passages = self.search(&context_query(claim)).await?;

        for (driver, issue) in findings.top_drivers() {
            let query = driver_query(&driver, issue, claim);
            if query.is_empty() {
                continue;
            }
            passages.extend(self.search(&query).await?);
        }

        let evidence: Vec<Evidence> = dedup_passages(passages, self.topk)
            .into_iter()
            .map(Evidence::from)
            .collect();
        debug!(claim_id = %claim.claim_id, evidence = evidence.len(), "evidence retrieved");
        Ok(evidence)
    }
}

/// Payer name, every CPT, every non-empty modifier and `pos {site}`.
pub fn context_query(claim: &Claim) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !claim.payer.name.is_empty() {
        parts.push(claim.payer.name.clone());
    }
    parts.extend(claim.cpts().into_iter().map(String::from));
    parts.extend(
        claim
            .lines
            .iter()
            .flat_map(|l| &l.modifiers)
            .filter(|m| !m.is_empty())
            .cloned(),
    );
    if let Some(site) = claim.site_of_service() {
        parts.push(format!("pos {site}"));
    }
    parts.join(" ")
}

/// Query text for one driver. May be empty, in which case no search is run.
pub fn driver_query(driver: &Driver, issue: &Issue, claim: &Claim) -> String {
    let cpt_pair = || claim.cpts().into_iter().take(2).filter(|c| !c.is_empty());
    match driver.kind {
        DriverKind::ModifierMissing => std::iter::once(MODIFIER_QUERY)
            .chain(cpt_pair())
            .collect::<Vec<_>>()
            .join(" "),
        DriverKind::DxIncompatibility => std::iter::once(INCOMPATIBILITY_QUERY)
            .chain(cpt_pair())
            .collect::<Vec<_>>()
            .join(" "),
        DriverKind::DxUnspecific => {
            let dx = issue
                .details
                .as_ref()
                .map(|d| d.from.as_str())
                .filter(|d| !d.is_empty())
                .or_else(|| {
                    claim
                        .lines
                        .get(driver.line)
                        .and_then(|l| l.dx.first())
                        .map(String::as_str)
                        .filter(|d| !d.is_empty())
                });
            match dx {
                Some(dx) => format!("{dx} specificity"),
                None => issue.reason.clone(),
            }
        }
        DriverKind::DocMissing | DriverKind::SosRestriction | DriverKind::Other => {
            issue.reason.clone()
        }
    }
}
