use parapet_core::catalog::MessageCatalog;
use parapet_core::config::SensorConfig;

/// List loaded rules with their presentation titles.
pub fn list(ruleset_arg: Option<&str>, json: bool) -> i32 {
    let config = SensorConfig::discover();
    let ruleset = super::load_ruleset(ruleset_arg, &config);
    let catalog = MessageCatalog::from_ruleset(&ruleset);

    if json {
        let doc: Vec<serde_json::Value> = ruleset
            .rules()
            .iter()
            .map(|rule| {
                serde_json::json!({
                    "id": rule.id,
                    "event_type": rule.event_type.to_string(),
                    "score_delta": rule.score_delta,
                    "severity": rule.severity,
                    "title": catalog.message(&rule.id, "title"),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(doc));
        return 0;
    }

    for rule in ruleset.rules() {
        let severity = rule
            .severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<26} score={:<4} severity={:<7} {}",
            rule.id,
            rule.event_type.to_string(),
            rule.score_delta,
            severity,
            catalog.message(&rule.id, "title"),
        );
    }
    0
}

/// Validate a ruleset document. Exit 1 when any entry was skipped.
pub fn validate(ruleset_arg: Option<&str>) -> i32 {
    let config = SensorConfig::discover();
    let ruleset = super::load_ruleset(ruleset_arg, &config);

    println!(
        "{} rule(s) loaded, {} skipped",
        ruleset.len(),
        ruleset.skipped
    );
    if ruleset.skipped > 0 {
        1
    } else {
        0
    }
}
