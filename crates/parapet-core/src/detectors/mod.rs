//! Detectors: thin adapters from one raw signal surface to normalized
//! events.
//!
//! Each detector subscribes to exactly one signal source, filters
//! aggressively at that source, and emits through the shared
//! [`crate::reporter::Emit`] sink. A detector that cannot attach degrades
//! to a no-op; nothing here ever panics into host code.

pub mod dom_mutation;
pub mod intrinsic_hook;
pub mod message_channel;

use crate::event::{DomMutation, Intrinsic, PageMessage};

/// A source of cross-document page messages.
pub trait MessageBus {
    fn subscribe(&mut self, handler: SignalHandler<PageMessage>) -> Result<(), String>;
}

/// A source of DOM mutation records.
pub trait MutationFeed {
    fn subscribe(&mut self, handler: SignalHandler<DomMutation>) -> Result<(), String>;
}

pub type SignalHandler<T> = Box<dyn FnMut(T) + Send>;

/// Observation-only tap installed on a hooked intrinsic. Receives the
/// call's first argument as a string.
pub type Tap = Box<dyn Fn(&str) + Send + Sync>;

/// The host's interception surface for global intrinsics.
///
/// The host owns the actual wrapping and must keep delegation unchanged:
/// identical arguments, identical return value, and prototype identity
/// preserved where the wrapped intrinsic is constructed via `new`. The
/// tap only observes. An `Err` from `install_tap` means that one
/// intrinsic stays unpatched.
pub trait IntrinsicHost {
    fn install_tap(&mut self, intrinsic: Intrinsic, tap: Tap) -> Result<(), String>;
}
