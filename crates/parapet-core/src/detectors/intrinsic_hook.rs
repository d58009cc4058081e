use serde_json::{json, Map};

use super::IntrinsicHost;
use crate::event::{EventType, Intrinsic, IntrinsicCall};
use crate::report::ReportMeta;
use crate::reporter::Emit;
use crate::util::truncate_bytes;

/// Bytes of call argument kept in the emitted preview.
pub const PREVIEW_BYTES: usize = 120;

/// Default set of intrinsics worth watching: the code evaluator, the
/// base64 decoder, and the dynamic-function constructor.
pub const DEFAULT_INTRINSICS: [Intrinsic; 3] =
    [Intrinsic::Eval, Intrinsic::Atob, Intrinsic::Function];

/// Observes calls to selected global intrinsics through host-installed
/// taps and emits `SUSP_*` events carrying a truncated argument preview.
///
/// The host guarantees the wrap is behavior-preserving; this detector
/// only decides what to watch and what to emit. A failed install leaves
/// that one intrinsic unpatched and produces a `HOOK_ERROR` event.
pub struct IntrinsicHookDetector {
    intrinsics: Vec<Intrinsic>,
}

impl Default for IntrinsicHookDetector {
    fn default() -> Self {
        Self {
            intrinsics: DEFAULT_INTRINSICS.to_vec(),
        }
    }
}

impl IntrinsicHookDetector {
    pub fn new(intrinsics: Vec<Intrinsic>) -> Self {
        Self { intrinsics }
    }

    /// Install one tap per watched intrinsic. Failures are per-intrinsic:
    /// the rest keep their taps.
    pub fn start(&self, host: &mut dyn IntrinsicHost, emit: Emit) {
        for &intrinsic in &self.intrinsics {
            let tap_emit = emit.clone();
            let result = host.install_tap(
                intrinsic,
                Box::new(move |argument| {
                    emit_call(intrinsic, argument, &tap_emit);
                }),
            );
            if let Err(e) = result {
                eprintln!("parapet: cannot hook {intrinsic}: {e}");
                let mut data = Map::new();
                data.insert("location".into(), json!(format!("hook.{intrinsic}")));
                data.insert("message".into(), json!(e));
                emit(EventType::HookError, data, ReportMeta::default());
            }
        }
    }

    /// Replay-path classifier for an already-observed call.
    pub fn on_call(&self, call: &IntrinsicCall, emit: &Emit) {
        if !self.intrinsics.contains(&call.intrinsic) {
            return;
        }
        emit_call(call.intrinsic, &call.argument, emit);
    }
}

fn emit_call(intrinsic: Intrinsic, argument: &str, emit: &Emit) {
    let preview = truncate_bytes(argument, PREVIEW_BYTES);
    let mut data = Map::new();
    data.insert("intrinsic".into(), json!(intrinsic.to_string()));
    data.insert("preview".into(), json!(preview));
    data.insert("argument_len".into(), json!(argument.len()));
    emit(intrinsic.event_type(), data, ReportMeta::default());
}
