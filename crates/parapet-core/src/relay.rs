use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::badge::{BadgeLevel, BadgeSurface, InMemoryBadges};
use crate::event::EventType;
use crate::forward::Forwarder;
use crate::report::{Severity, ThreatReport};
use crate::reporter::Transport;
use crate::threat_log::ThreatLogStore;

/// The only action the relay acts on; envelopes carrying anything else
/// are ignored.
pub const ACTION_REPORT_THREAT: &str = "REPORT_THREAT";

/// Cross-context transport envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub action: String,
    #[serde(default)]
    pub tab_id: i64,
    /// `val` is the legacy wire alias for this field.
    #[serde(alias = "val")]
    pub data: ThreatReport,
}

impl Envelope {
    pub fn report(tab_id: i64, data: ThreatReport) -> Self {
        Self {
            action: ACTION_REPORT_THREAT.to_string(),
            tab_id,
            data,
        }
    }
}

/// The aggregation point: one relay owns the badge map, the persisted
/// threat log, and the collector forwarder. Envelopes are processed one
/// at a time, to completion, so the log's read-modify-write never
/// interleaves.
pub struct Relay {
    badges: Box<dyn BadgeSurface>,
    store: Option<ThreatLogStore>,
    forwarder: Option<Forwarder>,
    retained: Vec<Severity>,
}

impl Relay {
    pub fn new(
        badges: Box<dyn BadgeSurface>,
        store: Option<ThreatLogStore>,
        forwarder: Option<Forwarder>,
        retained: Vec<Severity>,
    ) -> Self {
        Self {
            badges,
            store,
            forwarder,
            retained,
        }
    }

    /// A relay with an in-memory badge surface and no persistence or
    /// forwarding; the smallest useful configuration.
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryBadges::new()), None, None, vec![
            Severity::High,
            Severity::Medium,
        ])
    }

    /// Observable indicator level for a tab.
    pub fn badge_level(&self, tab_id: i64) -> BadgeLevel {
        self.badges.level(tab_id)
    }

    /// Process one envelope to completion.
    pub fn handle(&mut self, envelope: Envelope) {
        if envelope.action != ACTION_REPORT_THREAT {
            return;
        }
        let report = envelope.data;

        // Reset signal: clear the tab's indicator and stop: no log entry,
        // no forward.
        if report.event_type == EventType::SensorReady {
            self.badges.clear(envelope.tab_id);
            return;
        }

        self.badges
            .set(envelope.tab_id, BadgeLevel::for_severity(report.severity));

        if let Some(ref mut forwarder) = self.forwarder {
            forwarder.forward(&report);
        }

        if self.retained.contains(&report.severity) {
            if let Some(ref store) = self.store {
                store.append(report);
            }
        }
    }

    /// Spawn the relay on its own thread consuming an envelope channel.
    ///
    /// Per-sender FIFO order is the transport's ordering guarantee; the
    /// single consumer serializes everything else. The thread drains the
    /// channel and returns the relay (with its final badge state) once
    /// every [`RelayHandle`] clone is dropped.
    pub fn spawn(mut self) -> (RelayHandle, std::thread::JoinHandle<Relay>) {
        let (tx, rx) = mpsc::channel::<Envelope>();
        let handle = std::thread::spawn(move || {
            for envelope in rx {
                self.handle(envelope);
            }
            if let Some(ref mut forwarder) = self.forwarder {
                forwarder.flush();
            }
            self
        });
        (RelayHandle { tx }, handle)
    }
}

/// Cloneable sending half of the relay channel. One clone per reporter
/// keeps per-session FIFO order.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<Envelope>,
}

impl RelayHandle {
    pub fn send(&self, envelope: Envelope) -> Result<(), String> {
        self.tx
            .send(envelope)
            .map_err(|_| "relay channel closed".to_string())
    }
}

impl Transport for RelayHandle {
    fn deliver(&self, envelope: Envelope) -> Result<(), String> {
        self.send(envelope)
    }
}
