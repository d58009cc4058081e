use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};

use parapet_core::badge::{BadgeLevel, InMemoryBadges};
use parapet_core::catalog::MessageCatalog;
use parapet_core::config::SensorConfig;
use parapet_core::detectors::dom_mutation::DomMutationDetector;
use parapet_core::detectors::intrinsic_hook::IntrinsicHookDetector;
use parapet_core::detectors::message_channel::MessageChannelDetector;
use parapet_core::engine::RuleEngine;
use parapet_core::event::{EventType, RawSignal};
use parapet_core::forward::Forwarder;
use parapet_core::output;
use parapet_core::relay::{Envelope, Relay, RelayHandle};
use parapet_core::report::{Severity, ThreatReport};
use parapet_core::reporter::{emit_via, PageContext, Reporter, ReporterOptions, Transport};
use parapet_core::threat_log::ThreatLogStore;
use parapet_core::util::origin_of;

/// Synthetic page the replayed context is attributed to.
const REPLAY_PAGE_URL: &str = "https://replay.local/";

/// Transport that records what the reporter produced before handing it
/// to the relay. The reset signal is forwarded but not displayed.
struct TeeTransport {
    inner: RelayHandle,
    seen: Mutex<Vec<ThreatReport>>,
}

impl Transport for TeeTransport {
    fn deliver(&self, envelope: Envelope) -> Result<(), String> {
        if envelope.data.event_type != EventType::SensorReady {
            self.seen.lock().unwrap().push(envelope.data.clone());
        }
        self.inner.deliver(envelope)
    }
}

pub fn run(
    input: Option<&str>,
    json: bool,
    tab: i64,
    ruleset_arg: Option<&str>,
    collector_arg: Option<&str>,
    session_seed: Option<String>,
) -> i32 {
    let config = SensorConfig::discover();

    let ruleset = super::load_ruleset(ruleset_arg, &config);
    let catalog = match config.messages_path.as_deref() {
        Some(path) => MessageCatalog::load_path(std::path::Path::new(path)),
        None => MessageCatalog::from_json(crate::assets::DEFAULT_MESSAGES),
    };
    let engine = Arc::new(RuleEngine::new(ruleset));

    let store = ThreatLogStore::at_default_path(config.log_capacity);
    let forwarder = collector_arg
        .map(str::to_string)
        .or_else(|| config.collector_url.clone())
        .map(Forwarder::new);

    let relay = Relay::new(
        Box::new(InMemoryBadges::new()),
        store,
        forwarder,
        config.retained_severities.clone(),
    );
    let (handle, join) = relay.spawn();

    let tee = Arc::new(TeeTransport {
        inner: handle,
        seen: Mutex::new(Vec::new()),
    });

    let context = PageContext {
        page_url: REPLAY_PAGE_URL.to_string(),
        page_origin: origin_of(REPLAY_PAGE_URL),
        target_origin: origin_of(REPLAY_PAGE_URL),
        user_agent: format!("parapet/{}", env!("CARGO_PKG_VERSION")),
    };
    let reporter = Arc::new(Reporter::new(
        ReporterOptions {
            session_id: session_seed,
            context: context.clone(),
            tab_id: tab,
        },
        tee.clone(),
    ));
    let emit = emit_via(Some(engine), reporter.clone());

    let message_detector = MessageChannelDetector::new(config.expected_thirdparty_origin.clone());
    let hook_detector = IntrinsicHookDetector::default();
    let dom_detector = DomMutationDetector::new(context.page_origin.clone());

    // Sensor init: clears any stale indicator for this tab.
    reporter.send(
        EventType::SensorReady,
        serde_json::Map::new(),
        Default::default(),
    );

    let reader: Box<dyn BufRead> = match input {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("parapet: cannot open {path}: {e}");
                return 1;
            }
        },
        None => Box::new(std::io::stdin().lock()),
    };

    let mut malformed = 0usize;
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("parapet: input read error: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let signal: RawSignal = match serde_json::from_str(trimmed) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("parapet: skipping malformed signal: {e}");
                malformed += 1;
                continue;
            }
        };
        match signal {
            RawSignal::PageMessage(msg) => message_detector.on_message(&msg, &emit),
            RawSignal::IntrinsicCall(call) => hook_detector.on_call(&call, &emit),
            RawSignal::DomMutation(mutation) => dom_detector.on_mutation(&mutation, &emit),
        }
    }

    let reports = std::mem::take(&mut *tee.seen.lock().unwrap());

    // Close the channel so the relay drains and returns its final state.
    drop(emit);
    drop(reporter);
    drop(tee);
    let relay = match join.join() {
        Ok(r) => r,
        Err(_) => {
            eprintln!("parapet: relay thread panicked");
            return 1;
        }
    };

    if json {
        if output::write_json(&reports, std::io::stdout()).is_err() {
            return 1;
        }
    } else {
        let mut stderr = std::io::stderr();
        for report in &reports {
            let _ = output::write_human(report, &catalog, &mut stderr);
        }
        let badge = match relay.badge_level(tab) {
            BadgeLevel::Strongest => "strongest",
            BadgeLevel::Secondary => "secondary",
            BadgeLevel::None => "none",
        };
        eprintln!(
            "parapet: {} report(s), {} malformed line(s), indicator: {badge}",
            reports.len(),
            malformed
        );
    }

    let max_severity = reports.iter().map(|r| r.severity).max();
    match max_severity {
        Some(Severity::High) => 1,
        Some(Severity::Medium) | Some(Severity::Low) => 2,
        None => 0,
    }
}
