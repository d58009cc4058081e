use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventType, NormalizedEvent};
use crate::report::Severity;

/// One declarative rule as stored in the ruleset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    /// Normalized event tag this rule applies to (wire form).
    pub event_type: String,
    /// Exact context-origin equality, when present.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
    #[serde(default)]
    pub score_delta: i32,
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Explicit ordering; when any rule declares one, the ruleset is
    /// stably sorted by it once at load. Declaration order otherwise.
    #[serde(default)]
    pub priority: Option<i64>,
    /// Static evidence annotations merged into matched reports.
    #[serde(default)]
    pub evidence: serde_json::Map<String, Value>,
    /// locale -> field -> text, consulted by presentation surfaces.
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
}

/// A single predicate over one field of the event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDef {
    pub field: String,
    #[serde(flatten)]
    pub test: TestDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestDef {
    Equals(Value),
    Contains(String),
    Matches(String),
}

/// Top-level shape of the ruleset resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesetDoc {
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

enum Condition {
    Equals(String, Value),
    Contains(String, String),
    Matches(String, Regex),
}

/// A compiled rule ready for matching.
pub struct Rule {
    pub id: String,
    pub event_type: EventType,
    pub origin: Option<String>,
    conditions: Vec<Condition>,
    pub score_delta: i32,
    pub severity: Option<Severity>,
    pub priority: Option<i64>,
    pub evidence: serde_json::Map<String, Value>,
    pub messages: HashMap<String, HashMap<String, String>>,
}

impl Rule {
    /// Predicate evaluation. A condition over an absent field, or any
    /// shape the condition cannot be applied to, is a non-match; engine
    /// faults must never suppress the detector's ability to report with
    /// its own defaults.
    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if self.event_type != event.event_type {
            return false;
        }
        if let Some(ref origin) = self.origin {
            if origin != &event.context_origin {
                return false;
            }
        }
        self.conditions.iter().all(|c| match c {
            Condition::Equals(field, expected) => {
                event.data.get(field).is_some_and(|v| v == expected)
            }
            Condition::Contains(field, needle) => event
                .data
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(needle)),
            Condition::Matches(field, re) => event
                .data
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| re.is_match(s)),
        })
    }
}

/// An immutable, compiled ruleset. Safe for concurrent lookups: nothing
/// here mutates after load.
pub struct Ruleset {
    rules: Vec<Rule>,
    /// Definitions dropped at load (bad event tag, bad regex, oversized
    /// pattern). Kept as a count for `rules validate`.
    pub skipped: usize,
}

const MAX_PATTERN_LEN: usize = 1024;

impl Ruleset {
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            skipped: 0,
        }
    }

    /// Compile rule definitions. Malformed entries are logged and skipped;
    /// a bad ruleset degrades, it never fails initialization.
    pub fn compile(defs: Vec<RuleDef>) -> Self {
        let mut rules = Vec::new();
        let mut skipped = 0usize;

        for def in defs {
            let event_type: EventType =
                match serde_json::from_value(Value::String(def.event_type.clone())) {
                    Ok(t) => t,
                    Err(_) => {
                        eprintln!(
                            "parapet: rule '{}' names unknown event type '{}', skipping",
                            def.id, def.event_type
                        );
                        skipped += 1;
                        continue;
                    }
                };

            let mut conditions = Vec::with_capacity(def.conditions.len());
            let mut dropped = false;
            for cond in def.conditions {
                match cond.test {
                    TestDef::Equals(v) => conditions.push(Condition::Equals(cond.field, v)),
                    TestDef::Contains(s) => conditions.push(Condition::Contains(cond.field, s)),
                    TestDef::Matches(pattern) => {
                        if pattern.len() > MAX_PATTERN_LEN {
                            eprintln!(
                                "parapet: rule '{}' pattern too long ({} chars), skipping rule",
                                def.id,
                                pattern.len()
                            );
                            dropped = true;
                            break;
                        }
                        match Regex::new(&pattern) {
                            Ok(re) => conditions.push(Condition::Matches(cond.field, re)),
                            Err(e) => {
                                eprintln!(
                                    "parapet: rule '{}' has invalid regex: {e}, skipping rule",
                                    def.id
                                );
                                dropped = true;
                                break;
                            }
                        }
                    }
                }
            }
            if dropped {
                skipped += 1;
                continue;
            }

            rules.push(Rule {
                id: def.id,
                event_type,
                origin: def.origin,
                conditions,
                score_delta: def.score_delta,
                severity: def.severity,
                priority: def.priority,
                evidence: def.evidence,
                messages: def.messages,
            });
        }

        // The ruleset governs ordering: an explicit priority re-orders once
        // at load; the engine itself never re-orders per lookup.
        if rules.iter().any(|r| r.priority.is_some()) {
            rules.sort_by_key(|r| r.priority.unwrap_or(i64::MAX));
        }

        Self { rules, skipped }
    }

    /// Parse and compile a JSON ruleset document. Parse failure yields an
    /// empty ruleset with a console diagnostic.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<RulesetDoc>(json) {
            Ok(doc) => Self::compile(doc.rules),
            Err(e) => {
                eprintln!("parapet: cannot parse ruleset: {e}");
                Self::empty()
            }
        }
    }

    pub fn load_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) => {
                eprintln!("parapet: cannot read ruleset {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
