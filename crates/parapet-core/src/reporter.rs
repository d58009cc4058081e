use std::sync::Arc;

use serde_json::{Map, Value};

use crate::engine::RuleEngine;
use crate::event::{EventType, NormalizedEvent};
use crate::relay::Envelope;
use crate::report::{severity_for_score, ReportMeta, ThreatReport};
use crate::session;

/// The cross-context transport seam. The relay handle implements this;
/// tests substitute their own.
pub trait Transport: Send + Sync {
    fn deliver(&self, envelope: Envelope) -> Result<(), String>;
}

/// Page/environment context captured once per browsing context.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub page_url: String,
    pub page_origin: String,
    pub target_origin: String,
    pub user_agent: String,
}

#[derive(Default)]
pub struct ReporterOptions {
    /// Explicit session seed; a fresh opaque id is generated otherwise.
    pub session_id: Option<String>,
    pub context: PageContext,
    pub tab_id: i64,
}

/// Owns one session identity and turns detector emissions into immutable
/// [`ThreatReport`]s handed to the transport.
pub struct Reporter {
    session_id: String,
    context: PageContext,
    tab_id: i64,
    transport: Arc<dyn Transport>,
}

impl Reporter {
    pub fn new(options: ReporterOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            session_id: options
                .session_id
                .unwrap_or_else(session::generate_session_id),
            context: options.context,
            tab_id: options.tab_id,
            transport,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    /// Build a complete report and hand it to the transport. Synchronous
    /// and non-blocking from the caller's view; transport failure is
    /// logged here and never reaches the detector that triggered the
    /// send.
    ///
    /// Defaults for missing metadata: rule id falls back to the event
    /// tag, score to 0, severity to the score-table derivation, and
    /// data/evidence to empty mappings.
    pub fn send(&self, event_type: EventType, data: Map<String, Value>, meta: ReportMeta) {
        let score_delta = meta.score_delta.unwrap_or(0);
        let report = ThreatReport {
            event_type,
            rule_id: meta.rule_id.unwrap_or_else(|| event_type.to_string()),
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            page_url: self.context.page_url.clone(),
            page_origin: self.context.page_origin.clone(),
            target_origin: self.context.target_origin.clone(),
            user_agent: self.context.user_agent.clone(),
            severity: meta
                .severity
                .unwrap_or_else(|| severity_for_score(score_delta)),
            score_delta,
            data,
            evidence: meta.evidence,
        };

        if let Err(e) = self.transport.deliver(Envelope::report(self.tab_id, report)) {
            eprintln!("parapet: report transport failed: {e}");
        }
    }
}

/// Shared emit sink handed to detectors: classify through the engine when
/// one is present, then report. Detectors call it synchronously.
pub type Emit = Arc<dyn Fn(EventType, Map<String, Value>, ReportMeta) + Send + Sync>;

/// Wire an optional rule engine and a reporter into an [`Emit`] sink:
/// match → apply → send. An event no rule matches still flows through
/// with the detector's own base metadata.
pub fn emit_via(engine: Option<Arc<RuleEngine>>, reporter: Arc<Reporter>) -> Emit {
    Arc::new(move |event_type, data, base| {
        let meta = match engine.as_deref() {
            Some(engine) => {
                let event = NormalizedEvent {
                    event_type,
                    data: data.clone(),
                    context_origin: reporter.context().page_origin.clone(),
                };
                match engine.match_event(&event) {
                    Some(rule) => RuleEngine::apply(rule, base),
                    None => base,
                }
            }
            None => base,
        };
        reporter.send(event_type, data, meta);
    })
}
