//! Assess → Plan → Act over one loaded index and one audit log.

use std::sync::Arc;

use codexia_core::{
    Artifact, Assessment, Claim, Evidence, Findings, IndexError, PassageIndex, PlanResult,
    RiskWeights, TextEmbedder, act_on_plan, make_plan,
};
use codexia_store::{AuditLog, FlatIndex};
use tracing::{debug, info};

use crate::retriever::Retriever;
use crate::settings::{IndexBackend, Settings};
use crate::ServiceError;

pub struct Pipeline {
    retriever: Retriever,
    weights: RiskWeights,
    audit: AuditLog,
}

impl Pipeline {
    pub fn new(retriever: Retriever, weights: RiskWeights, audit: AuditLog) -> Self {
        Self {
            retriever,
            weights,
            audit,
        }
    }

    /// Load the configured embedder and index. The index is read once and
    /// shared read-only for the life of the pipeline.
    pub async fn open(settings: &Settings) -> Result<Self, ServiceError> {
        let embedder = codexia_ai::load_embedder(settings.embedding, &settings.model_dir)
            .map_err(|e| ServiceError::Internal(format!("load embedder: {e:#}")))?;
        let index = open_index(settings, embedder.as_ref()).await?;
        info!(
            backend = %settings.index_backend,
            vector_path = %settings.vector_path.display(),
            topk = settings.topk,
            "pipeline ready"
        );
        Ok(Self::new(
            Retriever::new(embedder, index, settings.topk),
            settings.risk_weights,
            AuditLog::new(&settings.audit_path),
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub async fn assess(&self, claim: &Claim) -> Result<Assessment, ServiceError> {
        let findings = Findings::analyze(claim, &self.weights);
        debug!(
            claim_id = %claim.claim_id,
            issues = findings.issues.len(),
            risk = findings.score.risk,
            "claim analysed"
        );
        let evidence = self.retriever.evidence_for(&findings).await?;
        Ok(findings.into_assessment(evidence))
    }

    pub fn plan(&self, claim: &Claim, assessment: &Assessment) -> PlanResult {
        let plans = make_plan(claim, assessment);
        debug!(claim_id = %claim.claim_id, order = ?plans.kinds(), "plans ranked");
        plans
    }

    /// Produce the artifact and append its audit record. A failed audit
    /// write fails the call.
    pub async fn act(
        &self,
        claim: &Claim,
        plans: &PlanResult,
        evidence: &[Evidence],
    ) -> Result<Artifact, ServiceError> {
        let artifact = act_on_plan(claim, plans, evidence)?;
        self.audit
            .record_act(&artifact)
            .await
            .map_err(ServiceError::Audit)?;
        Ok(artifact)
    }
}

async fn open_index(
    settings: &Settings,
    embedder: &dyn TextEmbedder,
) -> Result<Arc<dyn PassageIndex>, ServiceError> {
    match settings.index_backend {
        IndexBackend::Flat => {
            let index = FlatIndex::load_for(&settings.vector_path, embedder).map_err(IndexError::from)?;
            Ok(Arc::new(index))
        }
        IndexBackend::Lance => open_lance(settings).await,
    }
}

#[cfg(feature = "lancedb")]
async fn open_lance(settings: &Settings) -> Result<Arc<dyn PassageIndex>, ServiceError> {
    let index = codexia_store::LanceIndex::open(&settings.lance_path())
        .await
        .map_err(IndexError::from)?;
    Ok(Arc::new(index))
}

#[cfg(not(feature = "lancedb"))]
async fn open_lance(_settings: &Settings) -> Result<Arc<dyn PassageIndex>, ServiceError> {
    Err(IndexError::Unavailable("built without the lancedb feature".into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{built_settings, mod59_claim, sample_claim};
    use codexia_core::{ArtifactType, DriverKind, PlanKind};
    use tempfile::TempDir;

    #[tokio::test]
    async fn assess_mod59_claim() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::open(&built_settings(tmp.path()).await).await.unwrap();

        let assessment = pipeline.assess(&mod59_claim()).await.unwrap();
        assert!((0.0..=1.0).contains(&assessment.risk));
        assert_eq!(assessment.drivers[0].kind, DriverKind::ModifierMissing);
        assert_eq!(assessment.drivers[0].line, 0);
        assert!(assessment.evidence.len() <= 5);
        assert!(assessment.risk_tags.contains(&"modifier_missing".to_string()));

        let again = pipeline.assess(&mod59_claim()).await.unwrap();
        assert_eq!(assessment, again);
    }

    #[tokio::test]
    async fn full_recoding_round() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::open(&built_settings(tmp.path()).await).await.unwrap();
        let claim = mod59_claim();

        let assessment = pipeline.assess(&claim).await.unwrap();
        let plans = pipeline.plan(&claim, &assessment);
        assert_eq!(plans.kinds(), [PlanKind::Recoding, PlanKind::Appeal]);

        let day_before = chrono::Utc::now().date_naive();
        let first = pipeline.act(&claim, &plans, &assessment.evidence).await.unwrap();
        let second = pipeline.act(&claim, &plans, &assessment.evidence).await.unwrap();
        let day_after = chrono::Utc::now().date_naive();
        assert_eq!(first.artifact_type, ArtifactType::CorrectedClaim);
        assert_ne!(first.meta.input_sha256, first.meta.output_sha256);
        assert_eq!(first, second);

        let corrected = first.corrected_claim().unwrap();
        assert!(corrected.lines[0].modifiers.contains(&"59".to_string()));
        // The request claim is untouched.
        assert_eq!(claim.lines[0].modifiers, vec![String::new()]);

        // The two acts may straddle UTC midnight.
        let mut records = pipeline.audit().read_day(day_before).await.unwrap();
        if day_after != day_before {
            records.extend(pipeline.audit().read_day(day_after).await.unwrap());
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sha256, records[1].sha256);
    }

    #[tokio::test]
    async fn appeal_only_plan_uses_evidence() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::open(&built_settings(tmp.path()).await).await.unwrap();
        let claim = sample_claim("checkup_exercise.json");

        let assessment = pipeline.assess(&claim).await.unwrap();
        assert_eq!(assessment.drivers[0].kind, DriverKind::DxIncompatibility);
        let mut plans = pipeline.plan(&claim, &assessment);
        plans.plans.retain(|p| p.kind() == PlanKind::Appeal);

        let artifact = pipeline.act(&claim, &plans, &assessment.evidence).await.unwrap();
        let letter = artifact.appeal_letter().unwrap();
        assert!(letter.markdown.contains("CLM-3107"));
        assert!(!letter.cites.is_empty());
    }

    #[tokio::test]
    async fn missing_index_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            vector_path: tmp.path().join("nothing"),
            ..Settings::default()
        };
        let result = Pipeline::open(&settings).await;
        assert!(matches!(result, Err(ServiceError::IndexUnavailable(_))));
    }

    #[tokio::test]
    async fn empty_plan_list_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::open(&built_settings(tmp.path()).await).await.unwrap();
        let plans = PlanResult { plans: Vec::new() };
        let err = pipeline.act(&mod59_claim(), &plans, &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoPlanProvided));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn audit_failure_fails_act() {
        let tmp = TempDir::new().unwrap();
        let mut settings = built_settings(tmp.path()).await;
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        settings.audit_path = blocker.join("audit");
        let pipeline = Pipeline::open(&settings).await.unwrap();

        let claim = mod59_claim();
        let assessment = pipeline.assess(&claim).await.unwrap();
        let plans = pipeline.plan(&claim, &assessment);
        let err = pipeline.act(&claim, &plans, &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Audit(_)));
    }
}
