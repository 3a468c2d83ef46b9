//! Issues raised by the rule engines and the drivers derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of problems the rule engines can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ModifierMissing,
    DxUnspecific,
    DocMissing,
    DxIncompatibility,
    FormatError,
    SosRestriction,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModifierMissing => "modifier_missing",
            Self::DxUnspecific => "dx_unspecific",
            Self::DocMissing => "doc_missing",
            Self::DxIncompatibility => "dx_incompatibility",
            Self::FormatError => "format_error",
            Self::SosRestriction => "sos_restriction",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested code replacement attached to a `dx_unspecific` issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSuggestion {
    pub from: String,
    pub to: String,
}

/// A single finding against one claim line.
///
/// Identity is `(kind, line, reason)`; see [`crate::sort_key::dedup_issues`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub line: usize,
    #[serde(rename = "issue")]
    pub kind: IssueKind,
    #[serde(rename = "why")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<CodeSuggestion>,
    /// Sorted policy citations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_refs: Vec<String>,
}

impl Issue {
    pub fn new(line: usize, kind: IssueKind, reason: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            reason: reason.into(),
            details: None,
            policy_refs: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: CodeSuggestion) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut refs: Vec<String> = refs.into_iter().map(Into::into).collect();
        refs.sort();
        refs.dedup();
        self.policy_refs = refs;
        self
    }

    pub fn key(&self) -> (IssueKind, usize, &str) {
        (self.kind, self.line, self.reason.as_str())
    }
}

/// Issue kind as seen by drivers.
///
/// Declaration order is the driver priority: earlier variants rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    ModifierMissing,
    DxIncompatibility,
    DocMissing,
    DxUnspecific,
    SosRestriction,
    Other,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModifierMissing => "modifier_missing",
            Self::DxIncompatibility => "dx_incompatibility",
            Self::DocMissing => "doc_missing",
            Self::DxUnspecific => "dx_unspecific",
            Self::SosRestriction => "sos_restriction",
            Self::Other => "other",
        }
    }
}

impl From<IssueKind> for DriverKind {
    fn from(kind: IssueKind) -> Self {
        match kind {
            IssueKind::ModifierMissing => Self::ModifierMissing,
            IssueKind::DxUnspecific => Self::DxUnspecific,
            IssueKind::DocMissing => Self::DocMissing,
            IssueKind::DxIncompatibility => Self::DxIncompatibility,
            IssueKind::SosRestriction => Self::SosRestriction,
            IssueKind::FormatError => Self::Other,
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue reduced to what evidence retrieval and plan reasoning need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub line: usize,
    #[serde(rename = "issue")]
    pub kind: DriverKind,
    #[serde(rename = "why")]
    pub reason: String,
}

impl From<&Issue> for Driver {
    fn from(issue: &Issue) -> Self {
        Self {
            line: issue.line,
            kind: issue.kind.into(),
            reason: issue.reason.clone(),
        }
    }
}
