//! Request edge: payload cap, rate limit, parse, validate, then the pipeline.
//!
//! Transport-agnostic. A caller hands over the client key and the raw body
//! bytes, and gets back a typed response or a [`ServiceError`] with its
//! HTTP-equivalent status.

use std::fmt;
use std::sync::Arc;

use codexia_core::{Artifact, Assessment, Claim, PlanResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::guard::{PayloadCap, RateLimiter};
use crate::pipeline::Pipeline;
use crate::settings::Settings;
use crate::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Assess,
    Plan,
    Act,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Assess => "assess",
            Self::Plan => "plan",
            Self::Act => "act",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub claim: Claim,
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActRequest {
    pub claim: Claim,
    pub plan: PlanResult,
    /// Its evidence, when present, is cited by appeal letters.
    #[serde(default)]
    pub assessment: Option<Assessment>,
}

pub struct Gateway {
    pipeline: Arc<Pipeline>,
    cap: PayloadCap,
    limiter: RateLimiter,
}

impl Gateway {
    pub fn new(pipeline: Arc<Pipeline>, settings: &Settings) -> Self {
        Self {
            pipeline,
            cap: PayloadCap::new(settings.max_payload_bytes),
            limiter: RateLimiter::new(settings.rate_per_sec),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dispatch by route and return the response body as JSON.
    pub async fn handle(
        &self,
        route: Route,
        client: &str,
        body: &[u8],
    ) -> Result<serde_json::Value, ServiceError> {
        let value = match route {
            Route::Assess => to_value(&self.assess(client, body).await?)?,
            Route::Plan => to_value(&self.plan(client, body).await?)?,
            Route::Act => to_value(&self.act(client, body).await?)?,
        };
        Ok(value)
    }

    pub async fn assess(&self, client: &str, body: &[u8]) -> Result<Assessment, ServiceError> {
        let claim: Claim = self.admit(Route::Assess, client, body)?;
        claim.validate()?;
        self.pipeline.assess(&claim).await
    }

    pub async fn plan(&self, client: &str, body: &[u8]) -> Result<PlanResult, ServiceError> {
        let req: PlanRequest = self.admit(Route::Plan, client, body)?;
        req.claim.validate()?;
        Ok(self.pipeline.plan(&req.claim, &req.assessment))
    }

    pub async fn act(&self, client: &str, body: &[u8]) -> Result<Artifact, ServiceError> {
        let req: ActRequest = self.admit(Route::Act, client, body)?;
        req.claim.validate()?;
        let evidence = req.assessment.map(|a| a.evidence).unwrap_or_default();
        self.pipeline.act(&req.claim, &req.plan, &evidence).await
    }

    /// Size check first, then the client's token, then parsing.
    fn admit<T: DeserializeOwned>(
        &self,
        route: Route,
        client: &str,
        body: &[u8],
    ) -> Result<T, ServiceError> {
        self.cap.check(body)?;
        self.limiter.check(client)?;
        let parsed = serde_json::from_slice(body)
            .map_err(|e| ServiceError::Validation(format!("malformed {route} request: {e}")))?;
        info!(%route, client, bytes = body.len(), "request admitted");
        Ok(parsed)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(format!("serialize response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Captured, built_settings};
    use crate::telemetry::RedactingMakeWriter;
    use tempfile::TempDir;

    fn claim_json(notes: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "claimId": "C1",
            "payer": {"name": "p"},
            "patient": {"dob": "2000-01-01", "age": 1, "sex": "M"},
            "provider": {"npi": "1234567890"},
            "lines": [{"cpt": "A", "dx": ["B"], "modifiers": [], "units": 1, "charge": 1.0}],
            "notes": [notes],
        }))
        .unwrap()
    }

    async fn gateway(tmp: &TempDir, tweak: impl FnOnce(&mut Settings)) -> Gateway {
        let mut settings = built_settings(tmp.path()).await;
        tweak(&mut settings);
        let pipeline = Pipeline::open(&settings).await.unwrap();
        Gateway::new(Arc::new(pipeline), &settings)
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_parsing() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |s| s.max_payload_bytes = 1024).await;

        let big = claim_json(&"x".repeat(2048));
        let err = gw.assess("c", &big).await.unwrap_err();
        assert_eq!(err.status_code(), 413);

        let garbage = vec![b'{'; 2048];
        assert_eq!(gw.assess("c", &garbage).await.unwrap_err().status_code(), 413);

        assert!(gw.assess("c", &claim_json("ok")).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_codes_still_assess() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |_| {}).await;
        let assessment = gw.assess("c", &claim_json("")).await.unwrap();
        assert!(assessment.drivers.iter().any(|d| d.kind == codexia_core::DriverKind::Other));
    }

    #[tokio::test]
    async fn invalid_claim_is_a_validation_error() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |_| {}).await;

        let mut value: serde_json::Value = serde_json::from_slice(&claim_json("")).unwrap();
        value["provider"]["npi"] = "12345".into();
        let err = gw.assess("c", &serde_json::to_vec(&value).unwrap()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = gw.assess("c", b"not json").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn rate_limit_applies_per_client() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |s| s.rate_per_sec = 1.0).await;
        let body = claim_json("");
        for _ in 0..3 {
            gw.assess("10.0.0.1", &body).await.unwrap();
        }
        let err = gw.assess("10.0.0.1", &body).await.unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert!(gw.assess("10.0.0.2", &body).await.is_ok());
    }

    #[tokio::test]
    async fn assess_plan_act_over_json() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |_| {}).await;
        let path = crate::test_support::claims_dir().join("mod59_traction_exercise.json");
        let claim: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        let assessment = gw
            .handle(Route::Assess, "c", &serde_json::to_vec(&claim).unwrap())
            .await
            .unwrap();
        assert_eq!(assessment["drivers"][0]["issue"], "modifier_missing");

        let plan_req = serde_json::json!({"claim": claim, "assessment": assessment});
        let plans = gw
            .handle(Route::Plan, "c", &serde_json::to_vec(&plan_req).unwrap())
            .await
            .unwrap();
        assert_eq!(plans["plans"][0]["type"], "recoding");
        assert_eq!(plans["plans"][0]["actions"][0]["line"], 0);
        assert_eq!(plans["plans"][0]["actions"][0]["addModifier"], "59");

        let act_req = serde_json::json!({"claim": claim, "plan": plans});
        let artifact = gw
            .handle(Route::Act, "c", &serde_json::to_vec(&act_req).unwrap())
            .await
            .unwrap();
        assert_eq!(artifact["artifactType"], "corrected_claim");
        assert_eq!(artifact["payload"]["lines"][0]["modifiers"][0], "59");
    }

    #[tokio::test]
    async fn act_without_plans_is_400() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |_| {}).await;
        let claim: serde_json::Value = serde_json::from_slice(&claim_json("")).unwrap();
        let body = serde_json::json!({"claim": claim, "plan": {"plans": []}});
        let err = gw.act("c", &serde_json::to_vec(&body).unwrap()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoPlanProvided));
    }

    #[tokio::test]
    async fn debug_logs_carry_no_claim_content() {
        let tmp = TempDir::new().unwrap();
        let gw = gateway(&tmp, |_| {}).await;

        let sink = Captured::default();
        let writer = {
            let sink = sink.clone();
            move || sink.clone()
        };
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(RedactingMakeWriter::new(writer))
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        gw.assess("c", &claim_json("patient seen for knee pain")).await.unwrap();
        drop(guard);

        let logged = sink.text();
        assert!(logged.contains("request admitted"), "{logged}");
        assert!(!logged.contains("2000-01-01"), "{logged}");
        assert!(!logged.contains("knee pain"), "{logged}");
    }
}
