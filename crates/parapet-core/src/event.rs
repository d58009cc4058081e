use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed set of normalized event tags shared by all detectors.
///
/// Every detector translates its raw signals into one of these tags; the
/// rule engine, reporter, and relay never see anything else. The wire form
/// is the SCREAMING_SNAKE_CASE string (e.g. `"THIRDPARTY_POSTMESSAGE_ARM"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A third-party frame armed an attack over the page message bus.
    ThirdpartyPostmessageArm,
    /// The page called the code evaluator intrinsic.
    SuspEval,
    /// The page called the base64 decoder intrinsic.
    SuspAtob,
    /// The page constructed a function from a string.
    SuspFunction,
    /// A near-transparent full-viewport node was inserted over the page.
    InvisibleOverlay,
    /// An anchor's href was retargeted to a different origin.
    HrefSwap,
    /// A detector failed to attach to its signal source.
    HookError,
    /// Sensor (re)initialized for a tab; resets the tab's indicator.
    SensorReady,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{self:?}"));
        write!(f, "{s}")
    }
}

/// A normalized event as handed from a detector to the rule engine.
///
/// `data` must stay JSON-serializable: it crosses the context boundary
/// inside a [`crate::report::ThreatReport`] later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub context_origin: String,
}

/// Which global intrinsic a hook observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intrinsic {
    Eval,
    Atob,
    Function,
}

impl Intrinsic {
    pub fn event_type(self) -> EventType {
        match self {
            Intrinsic::Eval => EventType::SuspEval,
            Intrinsic::Atob => EventType::SuspAtob,
            Intrinsic::Function => EventType::SuspFunction,
        }
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intrinsic::Eval => write!(f, "eval"),
            Intrinsic::Atob => write!(f, "atob"),
            Intrinsic::Function => write!(f, "Function"),
        }
    }
}

/// A cross-document message observed on the page message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMessage {
    pub origin: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// A call observed through a hooked intrinsic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicCall {
    pub intrinsic: Intrinsic,
    /// Raw first argument as observed by the hook. Detectors truncate this
    /// to a bounded preview before it leaves the process.
    #[serde(default)]
    pub argument: String,
}

/// What kind of DOM change a mutation record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    NodeAdded,
    AttributeChanged,
}

/// A DOM mutation record as delivered by the host's mutation feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomMutation {
    pub change: MutationKind,
    /// Lowercased element name.
    pub tag: String,
    #[serde(default)]
    pub style: Option<String>,
    /// Name of the changed attribute, for `AttributeChanged` records.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

/// One raw signal from any monitored surface, as captured in a replay
/// stream. Ephemeral: owned by the observing detector, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSignal {
    PageMessage(PageMessage),
    IntrinsicCall(IntrinsicCall),
    DomMutation(DomMutation),
}
