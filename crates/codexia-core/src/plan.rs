//! Plan types exchanged between Plan and Act.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::issue::CodeSuggestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Recoding,
    Appeal,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recoding => "recoding",
            Self::Appeal => "appeal",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Plan {
    Recoding(RecodingPlan),
    Appeal(AppealPlan),
}

impl Plan {
    pub fn kind(&self) -> PlanKind {
        match self {
            Self::Recoding(_) => PlanKind::Recoding,
            Self::Appeal(_) => PlanKind::Appeal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecodingPlan {
    pub actions: Vec<RecodingAction>,
    pub rationale: String,
    /// Lead policy citation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite: Option<String>,
}

/// One edit to one claim line.
///
/// On the wire: `{"line": 0, "addModifier": "59", "cite": ".."}` or
/// `{"line": 1, "replaceDx": {"from": "M25.50", "to": "M25.512"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecodingAction {
    pub line: usize,
    #[serde(flatten)]
    pub op: RecodingOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecodingOp {
    AddModifier(String),
    ReplaceDx(CodeSuggestion),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealPlan {
    pub actions: Vec<AppealAction>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealAction {
    pub level: String,
    pub reason: String,
    #[serde(default)]
    pub cites: Vec<String>,
}

/// Output of Plan: one plan of each kind, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub plans: Vec<Plan>,
}

impl PlanResult {
    pub fn kinds(&self) -> Vec<PlanKind> {
        self.plans.iter().map(Plan::kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recoding_action_wire_shape() {
        let add = RecodingAction {
            line: 0,
            op: RecodingOp::AddModifier("59".into()),
            cite: Some("UHC-LCD-123 §3b".into()),
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            json!({"line": 0, "addModifier": "59", "cite": "UHC-LCD-123 §3b"})
        );

        let replace = RecodingAction {
            line: 1,
            op: RecodingOp::ReplaceDx(CodeSuggestion {
                from: "M25.50".into(),
                to: "M25.512".into(),
            }),
            cite: None,
        };
        assert_eq!(
            serde_json::to_value(&replace).unwrap(),
            json!({"line": 1, "replaceDx": {"from": "M25.50", "to": "M25.512"}})
        );
    }

    #[test]
    fn plans_parse_from_client_json() {
        let json = json!({"plans": [
            {"type": "recoding", "rationale": "r", "cite": "X §1",
             "actions": [{"line": 0, "addModifier": "59", "cite": null}]},
            {"type": "appeal", "rationale": "a",
             "actions": [{"level": "L1", "reason": "doc_missing", "cites": ["X §1"]}]}
        ]});
        let result: PlanResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.kinds(), vec![PlanKind::Recoding, PlanKind::Appeal]);
        let Plan::Recoding(rec) = &result.plans[0] else {
            panic!("expected recoding first");
        };
        assert_eq!(rec.actions[0].op, RecodingOp::AddModifier("59".into()));
        assert_eq!(rec.actions[0].cite, None);
    }

    #[test]
    fn unknown_plan_type_rejected() {
        let json = json!({"plans": [{"type": "refund", "actions": [], "rationale": ""}]});
        assert!(serde_json::from_value::<PlanResult>(json).is_err());
    }
}
