//! Claim model as received at the request edge.
//!
//! A [`Claim`] is never mutated by the pipeline: every stage that changes
//! codes works on a clone, so the original still hashes to the same
//! `input_sha256` after an Act.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid claim id regex"));
static NPI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("valid npi regex"));
static STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:A[KLRZ]|C[AOT]|D[EC]|FL|GA|HI|I[ADLN]|K[SY]|LA|M[EHDAINSOTP]|N[HCJMVY]|O[HKR]|P[AR]|RI|S[CD]|T[NX]|UT|V[AIT]|W[AIVY])$",
    )
    .expect("valid state regex")
});

/// A medical billing submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "claimId")]
    pub claim_id: String,
    pub payer: Payer,
    #[serde(default)]
    pub patient: Patient,
    #[serde(default)]
    pub provider: Provider,
    pub lines: Vec<ClaimLine>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    #[serde(rename = "planId", default)]
    pub plan_id: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub npi: String,
    #[serde(
        rename = "siteOfService",
        alias = "site_of_service",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub site_of_service: Option<String>,
}

/// One service line: a procedure with its diagnoses and modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimLine {
    pub cpt: String,
    #[serde(default)]
    pub dx: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub units: u32,
    #[serde(default)]
    pub charge: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<LineDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub ts: String,
    pub event: String,
}

/// Free-form line details as submitted by billing systems.
///
/// Three shapes are seen in the wild: an object carrying flags under one of a
/// handful of keys, a bare list of flags, or a single string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineDetails {
    Keyed(BTreeMap<String, serde_json::Value>),
    List(Vec<serde_json::Value>),
    Text(String),
}

/// Keys of a [`LineDetails::Keyed`] object that may carry flags, in lookup order.
const FLAG_KEYS: &[&str] = &["flags", "tags", "flag", "tag", "type", "category"];

impl LineDetails {
    /// Flatten whatever shape was submitted into a list of flag strings.
    pub fn flags(&self) -> Vec<String> {
        match self {
            Self::Keyed(map) => FLAG_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .flat_map(|value| match value {
                    serde_json::Value::String(s) => vec![s.clone()],
                    serde_json::Value::Array(items) => items.iter().map(scalar_text).collect(),
                    _ => Vec::new(),
                })
                .collect(),
            Self::List(items) => items.iter().map(scalar_text).collect(),
            Self::Text(s) => vec![s.clone()],
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Claim {
    /// Site of service, if the provider block carries a non-empty one.
    pub fn site_of_service(&self) -> Option<&str> {
        self.provider
            .site_of_service
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// CPT codes of every line, in line order.
    pub fn cpts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.cpt.as_str()).collect()
    }

    /// Structural checks on identity fields.
    ///
    /// Procedure and diagnosis code formats are deliberately not checked here:
    /// the rule validator reports them as `format_error` issues instead.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !ID_RE.is_match(&self.claim_id) {
            return Err(CoreError::Validation(format!(
                "claimId {:?} must match [A-Za-z0-9_-]+",
                self.claim_id
            )));
        }
        if !self.provider.npi.is_empty() && !NPI_RE.is_match(&self.provider.npi) {
            return Err(CoreError::Validation("provider.npi must be 10 digits".into()));
        }
        if !self.payer.state.is_empty() && !STATE_RE.is_match(&self.payer.state) {
            return Err(CoreError::Validation(format!(
                "payer.state {:?} is not a US state code",
                self.payer.state
            )));
        }
        if !self.payer.plan_id.is_empty() && !ID_RE.is_match(&self.payer.plan_id) {
            return Err(CoreError::Validation(format!(
                "payer.planId {:?} must match [A-Za-z0-9_-]+",
                self.payer.plan_id
            )));
        }
        Ok(())
    }
}
