//! Resources bundled into the binary.

/// Default ruleset, used when neither the CLI nor the config names one.
pub const DEFAULT_RULESET: &str = include_str!("../assets/ruleset.json");

/// Default message catalog resource, kept adjacent to the ruleset.
pub const DEFAULT_MESSAGES: &str = include_str!("../assets/messages.json");
