//! Integration tests for the parapet CLI binary.
//! Tests exercise subcommands via process invocation.

use std::fs;
use std::path::Path;
use std::process::Command;

/// Binary with platform dirs pinned into an isolated home, so tests never
/// touch the real config or data directories.
fn parapet(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parapet"));
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env("XDG_DATA_HOME", home.join(".local/share"));
    cmd.env_remove("PARAPET_CONFIG");
    cmd.env_remove("PARAPET_COLLECTOR_URL");
    cmd.env_remove("PARAPET_EXPECTED_ORIGIN");
    cmd.env_remove("PARAPET_LOG");
    cmd
}

fn write_signals(dir: &Path, name: &str, lines: &[&str]) -> String {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path.display().to_string()
}

const ARM_SIGNAL: &str = r#"{"kind":"page_message","origin":"http://localhost:4000","type":"AD_INTERACTION","action":"ARM_FORM_SWAP","payload":{"x":1}}"#;
const ARM_WRONG_ORIGIN: &str = r#"{"kind":"page_message","origin":"http://localhost:4001","type":"AD_INTERACTION","action":"ARM_FORM_SWAP","payload":{"x":1}}"#;
const EVAL_DOM: &str = r#"{"kind":"intrinsic_call","intrinsic":"eval","argument":"document.cookie"}"#;
const EVAL_PLAIN: &str = r#"{"kind":"intrinsic_call","intrinsic":"eval","argument":"1 + 1"}"#;
const OVERLAY: &str = r#"{"kind":"dom_mutation","change":"node_added","tag":"div","style":"position: fixed; inset: 0; width: 100vw; opacity: 0.01"}"#;

// ─── watch subcommand ───

#[test]
fn watch_arm_signal_warns_and_reports() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(2), "MEDIUM finding should exit 2");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("output should be valid JSON");
    assert_eq!(json["schema_version"], 1);
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["type"], "THIRDPARTY_POSTMESSAGE_ARM");
    assert_eq!(reports[0]["ruleId"], "THIRDPARTY_POSTMESSAGE_ARM");
    assert_eq!(reports[0]["severity"], "MEDIUM");
    assert_eq!(reports[0]["scoreDelta"], 15);
    assert_eq!(reports[0]["evidence"]["action"], "ARM_FORM_SWAP");
}

#[test]
fn watch_wrong_origin_yields_no_reports() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_WRONG_ORIGIN]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(0), "no findings should exit 0");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["reports"].as_array().unwrap().is_empty());
}

#[test]
fn watch_eval_dom_access_is_high() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[EVAL_DOM]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(1), "HIGH finding should exit 1");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports[0]["ruleId"], "EVAL_DOM_ACCESS");
    assert_eq!(reports[0]["severity"], "HIGH");
    assert_eq!(reports[0]["scoreDelta"], 50);
}

#[test]
fn watch_plain_eval_falls_through_to_generic_rule() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[EVAL_PLAIN]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(2));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports[0]["ruleId"], "SUSP_EVAL");
    // score 30 with no explicit severity: the fallback table says MEDIUM.
    assert_eq!(reports[0]["severity"], "MEDIUM");
}

#[test]
fn watch_malformed_lines_are_skipped() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(
        home.path(),
        "signals.jsonl",
        &["{not a signal", ARM_SIGNAL, ""],
    );

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(2));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["reports"].as_array().unwrap().len(), 1);
}

#[test]
fn watch_reports_share_one_session_id() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL, EVAL_DOM]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["sessionId"], reports[1]["sessionId"]);
}

#[test]
fn watch_session_seed_is_honored() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json", "--session", "seeded-id"])
        .output()
        .expect("failed to run parapet");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["reports"][0]["sessionId"], "seeded-id");
}

// ─── threat log ───

#[test]
fn watch_persists_retained_reports_and_log_exports_them() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL, OVERLAY]);

    let out = parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(1));

    let out = parapet(home.path())
        .args(["log", "export", "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    // Both MEDIUM and HIGH are in the retained set.
    assert_eq!(reports.len(), 2);

    let out = parapet(home.path())
        .args(["log", "clear"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(0));

    let out = parapet(home.path())
        .args(["log", "export", "--json"])
        .output()
        .expect("failed to run parapet");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["reports"].as_array().unwrap().is_empty());
}

#[test]
fn parapet_log_env_disables_persistence() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL]);

    let out = parapet(home.path())
        .env("PARAPET_LOG", "0")
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(2));

    let log_path = home
        .path()
        .join(".local/share/parapet/threat_logs.json");
    assert!(
        !log_path.exists() || fs::read_to_string(&log_path).unwrap().contains("\"threatLogs\":[]"),
        "PARAPET_LOG=0 must not retain reports"
    );
}

#[test]
fn log_stats_counts_by_severity() {
    let home = tempfile::tempdir().unwrap();
    let input = write_signals(home.path(), "signals.jsonl", &[ARM_SIGNAL, OVERLAY]);

    parapet(home.path())
        .args(["watch", "--input", &input, "--json"])
        .output()
        .expect("failed to run parapet");

    let out = parapet(home.path())
        .args(["log", "stats", "--json"])
        .output()
        .expect("failed to run parapet");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["by_severity"]["MEDIUM"], 1);
    assert_eq!(json["by_severity"]["HIGH"], 1);
    assert_eq!(json["sessions"], 1);
}

// ─── rules subcommand ───

#[test]
fn rules_list_shows_bundled_rules() {
    let home = tempfile::tempdir().unwrap();
    let out = parapet(home.path())
        .args(["rules", "list", "--json"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"THIRDPARTY_POSTMESSAGE_ARM"));
    assert!(ids.contains(&"INVISIBLE_OVERLAY"));
}

#[test]
fn rules_validate_clean_ruleset_passes() {
    let home = tempfile::tempdir().unwrap();
    let out = parapet(home.path())
        .args(["rules", "validate"])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn rules_validate_flags_skipped_entries() {
    let home = tempfile::tempdir().unwrap();
    let bad = home.path().join("bad_ruleset.json");
    fs::write(
        &bad,
        r#"{"rules": [
            {"id": "ok", "event_type": "HREF_SWAP"},
            {"id": "bad", "event_type": "NOT_A_TAG"}
        ]}"#,
    )
    .unwrap();

    let out = parapet(home.path())
        .args(["rules", "validate", "--ruleset", &bad.display().to_string()])
        .output()
        .expect("failed to run parapet");
    assert_eq!(out.status.code(), Some(1), "skipped entries should exit 1");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1 rule(s) loaded, 1 skipped"));
}
