use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::event::EventType;

/// Severity level for threat reports.
///
/// Drives both the per-tab indicator strength and log retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Derive a severity from a score when no rule supplies one explicitly.
///
/// Contract, boundaries inclusive: score >= 50 is HIGH, score >= 25 is
/// MEDIUM, anything below is LOW.
pub fn severity_for_score(score: i32) -> Severity {
    if score >= 50 {
        Severity::High
    } else if score >= 25 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Match metadata accompanying a detector emission.
///
/// Detectors supply a base; the rule engine merges rule-declared fields on
/// top (see [`crate::engine::RuleEngine::apply`]). Every field is optional;
/// the reporter fills documented defaults for whatever is still missing.
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub rule_id: Option<String>,
    pub severity: Option<Severity>,
    pub score_delta: Option<i32>,
    pub evidence: Map<String, Value>,
}

impl ReportMeta {
    /// Fixed-match metadata for detectors that classify at the source.
    pub fn fixed(rule_id: &str, severity: Severity, score_delta: i32) -> Self {
        Self {
            rule_id: Some(rule_id.to_string()),
            severity: Some(severity),
            score_delta: Some(score_delta),
            evidence: Map::new(),
        }
    }

    pub fn with_evidence(mut self, key: &str, value: Value) -> Self {
        self.evidence.insert(key.to_string(), value);
        self
    }
}

/// Immutable record of one detected event, session-scoped and enriched
/// with page context. Serialized form is the collector wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatReport {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub rule_id: String,
    #[serde(alias = "sid")]
    pub session_id: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub page_url: String,
    pub page_origin: String,
    pub target_origin: String,
    pub user_agent: String,
    pub severity: Severity,
    pub score_delta: i32,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub evidence: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_table_boundaries_inclusive() {
        assert_eq!(severity_for_score(50), Severity::High);
        assert_eq!(severity_for_score(51), Severity::High);
        assert_eq!(severity_for_score(49), Severity::Medium);
        assert_eq!(severity_for_score(25), Severity::Medium);
        assert_eq!(severity_for_score(24), Severity::Low);
        assert_eq!(severity_for_score(0), Severity::Low);
        assert_eq!(severity_for_score(-10), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_wire_form() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_report_wire_field_names() {
        let report = ThreatReport {
            event_type: EventType::SuspEval,
            rule_id: "SUSP_EVAL".into(),
            session_id: "abc".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            page_url: "https://shop.example/checkout".into(),
            page_origin: "https://shop.example".into(),
            target_origin: "https://shop.example".into(),
            user_agent: "test".into(),
            severity: Severity::Medium,
            score_delta: 30,
            data: Map::new(),
            evidence: Map::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["type"], "SUSP_EVAL");
        assert_eq!(json["ruleId"], "SUSP_EVAL");
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["pageUrl"], "https://shop.example/checkout");
        assert_eq!(json["scoreDelta"], 30);
    }

    #[test]
    fn test_report_accepts_sid_wire_alias() {
        let json = r#"{
            "type": "SUSP_EVAL", "ruleId": "r", "sid": "s1",
            "timestamp": "t", "pageUrl": "u", "pageOrigin": "o",
            "targetOrigin": "o", "userAgent": "ua",
            "severity": "LOW", "scoreDelta": 0
        }"#;
        let report: ThreatReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.session_id, "s1");
    }
}
