//! Plain-text rendering of verification results.
//!
//! Every failure is listed before the verdict line.

use replcheck_core::OutcomeStatus;
use replcheck_verify::{KeyScanReport, Summary};
use std::io::{self, Write};

const RULE: &str = "======================================================================";

pub fn render_summary(title: &str, summary: &Summary, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Total test keys: {}", summary.total)?;
    writeln!(out, "Matched:         {}", summary.matched)?;
    writeln!(out, "Failed:          {}", summary.failed())?;

    if !summary.failures.is_empty() {
        for status in [
            OutcomeStatus::Missing,
            OutcomeStatus::TypeMismatch,
            OutcomeStatus::ValueMismatch,
            OutcomeStatus::Error,
        ] {
            let count = summary.count(status);
            if count > 0 {
                writeln!(out, "  {status}: {count}")?;
            }
        }
        writeln!(out, "Loss rate:       {:.1}%", summary.loss_rate() * 100.0)?;
        writeln!(out)?;
        writeln!(out, "Failed keys:")?;
        for failure in &summary.failures {
            writeln!(
                out,
                "  - {} [{}] {}: {}",
                failure.key, failure.kind, failure.status, failure.detail
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", summary.summary_line())?;
    writeln!(out, "{RULE}")
}

pub fn render_key_scan(report: &KeyScanReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Comparison complete: source={}, target={}, missing={}",
        report.source_keys,
        report.target_keys,
        report.missing.len()
    )?;
    if report.is_consistent() {
        return writeln!(out, "Data consistency verified: no missing keys");
    }
    for key in &report.missing {
        writeln!(out, "  - {key}")?;
    }
    let breakdown: Vec<String> = report
        .missing_by_type
        .iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect();
    writeln!(out, "Missing key types: {}", breakdown.join(", "))
}
