use std::collections::BTreeMap;

use parapet_core::config::SensorConfig;
use parapet_core::output;
use parapet_core::threat_log::ThreatLogStore;

fn open_store() -> Option<ThreatLogStore> {
    let config = SensorConfig::discover();
    let store = ThreatLogStore::at_default_path(config.log_capacity);
    if store.is_none() {
        eprintln!("parapet: no data directory available for the threat log");
    }
    store
}

/// Print retained reports.
pub fn export(json: bool) -> i32 {
    let Some(store) = open_store() else {
        return 1;
    };
    let reports = store.read();

    if json {
        if output::write_json(&reports, std::io::stdout()).is_err() {
            return 1;
        }
        return 0;
    }

    if reports.is_empty() {
        println!("threat log is empty");
        return 0;
    }
    for report in &reports {
        println!(
            "{}  [{}] {:<28} session={} page={}",
            report.timestamp, report.severity, report.rule_id, report.session_id, report.page_url
        );
    }
    0
}

/// Show summary statistics over the retained reports.
pub fn stats(json: bool) -> i32 {
    let Some(store) = open_store() else {
        return 1;
    };
    let reports = store.read();

    let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_rule: BTreeMap<String, usize> = BTreeMap::new();
    let mut sessions: BTreeMap<String, usize> = BTreeMap::new();
    for report in &reports {
        *by_severity.entry(report.severity.to_string()).or_default() += 1;
        *by_rule.entry(report.rule_id.clone()).or_default() += 1;
        *sessions.entry(report.session_id.clone()).or_default() += 1;
    }

    if json {
        let doc = serde_json::json!({
            "total": reports.len(),
            "by_severity": by_severity,
            "by_rule": by_rule,
            "sessions": sessions.len(),
        });
        println!("{doc}");
        return 0;
    }

    println!("total reports: {}", reports.len());
    println!("sessions:      {}", sessions.len());
    for (severity, count) in &by_severity {
        println!("  {severity:<8} {count}");
    }
    println!("by rule:");
    for (rule, count) in &by_rule {
        println!("  {rule:<28} {count}");
    }
    0
}

/// Drop all retained reports.
pub fn clear() -> i32 {
    let Some(store) = open_store() else {
        return 1;
    };
    store.clear();
    println!("threat log cleared");
    0
}
