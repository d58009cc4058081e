use std::io::Write;

use crate::catalog::MessageCatalog;
use crate::report::{Severity, ThreatReport};

const SCHEMA_VERSION: u32 = 1;

/// JSON output wrapper with schema version.
#[derive(serde::Serialize)]
pub struct JsonOutput<'a> {
    pub schema_version: u32,
    pub reports: &'a [ThreatReport],
}

/// Write a batch of reports as one JSON document.
pub fn write_json(reports: &[ThreatReport], mut w: impl Write) -> std::io::Result<()> {
    let output = JsonOutput {
        schema_version: SCHEMA_VERSION,
        reports,
    };
    serde_json::to_writer(&mut w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Write one report in human-readable form, resolving presentation text
/// through the catalog.
pub fn write_human(
    report: &ThreatReport,
    catalog: &MessageCatalog,
    mut w: impl Write,
) -> std::io::Result<()> {
    let severity_color = match report.severity {
        Severity::High => "\x1b[31m",   // red
        Severity::Medium => "\x1b[33m", // yellow
        Severity::Low => "\x1b[36m",    // cyan
    };
    let reset = "\x1b[0m";

    writeln!(
        w,
        "  {}[{}]{} {} — {}",
        severity_color,
        report.severity,
        reset,
        report.rule_id,
        catalog.message(&report.rule_id, "title"),
    )?;
    writeln!(w, "    {}", catalog.message(&report.rule_id, "body"))?;
    if !report.evidence.is_empty() {
        for (key, value) in &report.evidence {
            writeln!(w, "    {key}: {value}")?;
        }
    }
    Ok(())
}
