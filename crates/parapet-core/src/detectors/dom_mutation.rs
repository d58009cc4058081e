use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};

use super::MutationFeed;
use crate::event::{DomMutation, EventType, MutationKind};
use crate::report::ReportMeta;
use crate::reporter::Emit;
use crate::util::origin_of;

/// Opacity at or below this is treated as invisible to the user.
const OVERLAY_OPACITY_MAX: f64 = 0.05;

static OPACITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"opacity\s*:\s*([0-9]*\.?[0-9]+)").unwrap());
static FIXED_POSITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"position\s*:\s*(fixed|absolute)").unwrap());
static FULL_VIEWPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(width\s*:\s*100(vw|%))|(inset\s*:\s*0)").unwrap()
});

/// Watches DOM mutation records for two UI-redress shapes: a
/// near-transparent full-viewport overlay being inserted, and an anchor's
/// target being swapped to a different origin.
pub struct DomMutationDetector {
    page_origin: String,
}

impl DomMutationDetector {
    pub fn new(page_origin: impl Into<String>) -> Self {
        Self {
            page_origin: page_origin.into(),
        }
    }

    pub fn start(self, feed: &mut dyn MutationFeed, emit: Emit) {
        let handler_emit = emit.clone();
        let result = feed.subscribe(Box::new(move |mutation| {
            self.on_mutation(&mutation, &handler_emit);
        }));
        if let Err(e) = result {
            eprintln!("parapet: dom-mutation detector failed to attach: {e}");
            let mut data = Map::new();
            data.insert("location".into(), json!("dom_mutation.subscribe"));
            data.insert("message".into(), json!(e));
            emit(EventType::HookError, data, ReportMeta::default());
        }
    }

    /// Classify one mutation record, emitting at most one event.
    pub fn on_mutation(&self, mutation: &DomMutation, emit: &Emit) {
        match mutation.change {
            MutationKind::NodeAdded => self.check_overlay(mutation, emit),
            MutationKind::AttributeChanged => self.check_href_swap(mutation, emit),
        }
    }

    fn check_overlay(&self, mutation: &DomMutation, emit: &Emit) {
        let Some(ref style) = mutation.style else {
            return;
        };
        if !is_invisible_overlay(style) {
            return;
        }

        let mut data = Map::new();
        data.insert("tag".into(), json!(mutation.tag));
        data.insert("style".into(), json!(style));

        let meta = ReportMeta::default()
            .with_evidence("tag", json!(mutation.tag))
            .with_evidence("style", json!(style));
        emit(EventType::InvisibleOverlay, data, meta);
    }

    fn check_href_swap(&self, mutation: &DomMutation, emit: &Emit) {
        if mutation.tag != "a" || mutation.attribute.as_deref() != Some("href") {
            return;
        }
        let (Some(old), Some(new)) = (&mutation.old_value, &mutation.new_value) else {
            return;
        };
        let new_origin = origin_of(new);
        // Only a cross-origin retarget is interesting; same-origin edits
        // are routine DOM churn.
        if new_origin == origin_of(old) || new_origin == self.page_origin {
            return;
        }

        let mut data = Map::new();
        data.insert("old".into(), json!(old));
        data.insert("new".into(), json!(new));

        let meta = ReportMeta::default()
            .with_evidence("old_href", json!(old))
            .with_evidence("new_href", json!(new))
            .with_evidence("new_origin", json!(new_origin));
        emit(EventType::HrefSwap, data, meta);
    }
}

fn is_invisible_overlay(style: &str) -> bool {
    let opacity = OPACITY_RE
        .captures(style)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    let Some(opacity) = opacity else {
        return false;
    };
    opacity <= OVERLAY_OPACITY_MAX
        && FIXED_POSITION_RE.is_match(style)
        && FULL_VIEWPORT_RE.is_match(style)
}
