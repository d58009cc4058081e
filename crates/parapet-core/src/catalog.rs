use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::rules::Ruleset;

/// Locale used when the caller does not name one.
pub const DEFAULT_LOCALE: &str = "en";

/// Fixed generic text for non-title lookups that resolve nothing.
pub const FALLBACK_WARNING: &str = "Suspicious activity was detected on this page.";

/// Lazily-loaded rule id -> locale -> field -> text mapping, consulted
/// only by presentation surfaces. Load failure yields an empty catalog:
/// every lookup then resolves via the fallback path, never an error.
#[derive(Debug, Default, Deserialize)]
pub struct MessageCatalog {
    #[serde(flatten)]
    rules: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

static CATALOG: OnceLock<MessageCatalog> = OnceLock::new();

impl MessageCatalog {
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("parapet: cannot parse message catalog: {e}");
                Self::default()
            }
        }
    }

    pub fn load_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) => {
                eprintln!("parapet: cannot read message catalog {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Build a catalog from the per-rule `messages` blocks of a loaded
    /// ruleset, for hosts that bundle no separate messages resource.
    pub fn from_ruleset(ruleset: &Ruleset) -> Self {
        let mut rules = HashMap::new();
        for rule in ruleset.rules() {
            if !rule.messages.is_empty() {
                rules.insert(rule.id.clone(), rule.messages.clone());
            }
        }
        Self { rules }
    }

    /// Exact lookup; `None` when the rule, locale, or field is absent.
    pub fn lookup(&self, rule_id: &str, locale: &str, field: &str) -> Option<&str> {
        self.rules
            .get(rule_id)?
            .get(locale)?
            .get(field)
            .map(String::as_str)
    }

    /// Lookup with the documented fallback: a missing title-class field
    /// resolves to the rule id itself, anything else to the generic
    /// warning text.
    pub fn message_for(&self, rule_id: &str, locale: &str, field: &str) -> String {
        if let Some(text) = self.lookup(rule_id, locale, field) {
            return text.to_string();
        }
        if field == "title" {
            rule_id.to_string()
        } else {
            FALLBACK_WARNING.to_string()
        }
    }

    pub fn message(&self, rule_id: &str, field: &str) -> String {
        self.message_for(rule_id, DEFAULT_LOCALE, field)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Install the process-wide catalog by loading `path` exactly once.
/// Concurrent first callers all share the same in-flight load; later
/// calls return the cached instance regardless of `path`.
pub fn init(path: &Path) -> &'static MessageCatalog {
    CATALOG.get_or_init(|| MessageCatalog::load_path(path))
}

/// Process-wide lookup. Before any [`init`], behaves as an empty catalog.
pub fn threat_message(rule_id: &str, field: &str) -> String {
    match CATALOG.get() {
        Some(catalog) => catalog.message(rule_id, field),
        None => MessageCatalog::default().message(rule_id, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> MessageCatalog {
        MessageCatalog::from_json(
            &json!({
                "THIRDPARTY_POSTMESSAGE_ARM": {
                    "en": {
                        "title": "Third-party frame armed an attack",
                        "body": "A cross-document message armed a form swap on this page."
                    },
                    "de": {
                        "title": "Drittanbieter-Frame hat einen Angriff vorbereitet"
                    }
                }
            })
            .to_string(),
        )
    }

    #[test]
    fn test_exact_lookup() {
        let c = catalog();
        assert_eq!(
            c.message("THIRDPARTY_POSTMESSAGE_ARM", "title"),
            "Third-party frame armed an attack"
        );
        assert_eq!(
            c.message_for("THIRDPARTY_POSTMESSAGE_ARM", "de", "title"),
            "Drittanbieter-Frame hat einen Angriff vorbereitet"
        );
    }

    #[test]
    fn test_unknown_rule_title_falls_back_to_rule_id() {
        let c = catalog();
        assert_eq!(c.message("UNKNOWN_RULE", "title"), "UNKNOWN_RULE");
    }

    #[test]
    fn test_unknown_rule_body_falls_back_to_generic_text() {
        let c = catalog();
        assert_eq!(c.message("UNKNOWN_RULE", "body"), FALLBACK_WARNING);
    }

    #[test]
    fn test_missing_field_in_known_locale_falls_back() {
        let c = catalog();
        // de has a title but no body.
        assert_eq!(
            c.message_for("THIRDPARTY_POSTMESSAGE_ARM", "de", "body"),
            FALLBACK_WARNING
        );
    }

    #[test]
    fn test_unparseable_resource_yields_empty_catalog() {
        let c = MessageCatalog::from_json("{broken");
        assert!(c.is_empty());
        assert_eq!(c.message("ANY", "title"), "ANY");
        assert_eq!(c.message("ANY", "body"), FALLBACK_WARNING);
    }

    #[test]
    fn test_missing_file_yields_empty_catalog() {
        let c = MessageCatalog::load_path(Path::new("/nonexistent/messages.json"));
        assert!(c.is_empty());
    }

    // Sole test touching the process-wide slot: OnceLock state is shared
    // across the whole test binary.
    #[test]
    fn test_global_init_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("messages.json");
        std::fs::write(
            &first,
            json!({"R1": {"en": {"title": "First load"}}}).to_string(),
        )
        .unwrap();
        let second = dir.path().join("other.json");
        std::fs::write(
            &second,
            json!({"R1": {"en": {"title": "Second load"}}}).to_string(),
        )
        .unwrap();

        init(&first);
        // Concurrent or repeated init never re-fetches.
        init(&second);
        assert_eq!(threat_message("R1", "title"), "First load");
        assert_eq!(threat_message("R2", "title"), "R2");
        assert_eq!(threat_message("R2", "body"), FALLBACK_WARNING);
    }

    #[test]
    fn test_from_ruleset_collects_message_blocks() {
        let ruleset = Ruleset::from_json(
            &json!({"rules": [{
                "id": "HREF_SWAP",
                "event_type": "HREF_SWAP",
                "messages": {"en": {"title": "Link target swapped"}}
            }]})
            .to_string(),
        );
        let c = MessageCatalog::from_ruleset(&ruleset);
        assert_eq!(c.message("HREF_SWAP", "title"), "Link target swapped");
    }
}
