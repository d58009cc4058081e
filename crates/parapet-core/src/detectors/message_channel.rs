use serde_json::{json, Map};

use super::MessageBus;
use crate::event::{EventType, PageMessage};
use crate::report::{ReportMeta, Severity};
use crate::reporter::Emit;

/// Literal message shape the third-party arming channel uses.
pub const EXPECTED_TYPE: &str = "AD_INTERACTION";
pub const EXPECTED_ACTION: &str = "ARM_FORM_SWAP";

/// Fixed classification for an accepted arming message.
pub const RULE_ID: &str = "THIRDPARTY_POSTMESSAGE_ARM";
const SCORE_DELTA: i32 = 15;

/// Watches the page message bus for the third-party "arm" handshake.
///
/// A message is accepted only on an exact triple match: declared origin,
/// `type`, and `action` all equal their expected literals. Anything else
/// is dropped without a trace.
pub struct MessageChannelDetector {
    expected_origin: String,
}

impl MessageChannelDetector {
    pub fn new(expected_origin: impl Into<String>) -> Self {
        Self {
            expected_origin: expected_origin.into(),
        }
    }

    /// Attach to the bus. Subscription failure degrades to a no-op with a
    /// `HOOK_ERROR` diagnostic event; re-registration is the bus's
    /// concern and must not crash.
    pub fn start(self, bus: &mut dyn MessageBus, emit: Emit) {
        let handler_emit = emit.clone();
        let result = bus.subscribe(Box::new(move |msg| {
            self.on_message(&msg, &handler_emit);
        }));
        if let Err(e) = result {
            eprintln!("parapet: message-channel detector failed to attach: {e}");
            let mut data = Map::new();
            data.insert("location".into(), json!("message_channel.subscribe"));
            data.insert("message".into(), json!(e));
            emit(EventType::HookError, data, ReportMeta::default());
        }
    }

    /// Classify one observed message, emitting at most one event.
    pub fn on_message(&self, msg: &PageMessage, emit: &Emit) {
        if msg.origin != self.expected_origin
            || msg.msg_type != EXPECTED_TYPE
            || msg.action != EXPECTED_ACTION
        {
            return;
        }

        let mut data = Map::new();
        data.insert("origin".into(), json!(msg.origin));
        data.insert("payload".into(), msg.payload.clone());

        let meta = ReportMeta::fixed(RULE_ID, Severity::Medium, SCORE_DELTA)
            .with_evidence("origin", json!(msg.origin))
            .with_evidence("type", json!(msg.msg_type))
            .with_evidence("action", json!(msg.action))
            .with_evidence("payload", msg.payload.clone());

        emit(EventType::ThirdpartyPostmessageArm, data, meta);
    }
}
