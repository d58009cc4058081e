use std::sync::{Arc, OnceLock};

use crate::event::NormalizedEvent;
use crate::report::ReportMeta;
use crate::rules::{Rule, Ruleset};

/// Matches normalized events against an immutable loaded ruleset.
///
/// The ruleset is read-only after construction, so any number of detectors
/// may call [`RuleEngine::match_event`] concurrently without locking.
pub struct RuleEngine {
    ruleset: Ruleset,
}

/// Process-wide engine, installed once.
static ENGINE: OnceLock<Arc<RuleEngine>> = OnceLock::new();

impl RuleEngine {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }

    /// Install a process-wide engine. The first call wins; later calls
    /// return the already-installed instance.
    pub fn install(ruleset: Ruleset) -> Arc<RuleEngine> {
        ENGINE
            .get_or_init(|| Arc::new(RuleEngine::new(ruleset)))
            .clone()
    }

    pub fn installed() -> Option<Arc<RuleEngine>> {
        ENGINE.get().cloned()
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Return the first rule satisfied by the event, in ruleset order, or
    /// `None`. Callers tolerate `None` by falling back to their own base
    /// metadata; predicate faults were already degraded to non-matches at
    /// load or inside [`Rule::matches`].
    pub fn match_event(&self, event: &NormalizedEvent) -> Option<&Rule> {
        self.ruleset.rules().iter().find(|r| r.matches(event))
    }

    /// Merge rule-declared metadata into caller-supplied base metadata.
    ///
    /// Rule-declared severity and score take precedence over caller
    /// defaults; evidence is the union, with rule annotations layered on
    /// top of (not replacing) caller evidence.
    pub fn apply(rule: &Rule, base: ReportMeta) -> ReportMeta {
        let mut merged = base;
        merged.rule_id = Some(rule.id.clone());
        if let Some(severity) = rule.severity {
            merged.severity = Some(severity);
        }
        merged.score_delta = Some(rule.score_delta);
        for (key, value) in &rule.evidence {
            merged.evidence.insert(key.clone(), value.clone());
        }
        merged
    }
}
