//! JSON reporter
//!
//! Outputs a summary plus every verdict as pretty-printed JSON.
//! Useful for CI annotations or piping to jq.

use crate::coverage::{CoverageReport, Verdict};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    total: usize,
    failed: usize,
    verdicts: &'a [Verdict],
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<String>,
}

/// Render report as JSON, with the matching transcript under `debug` if asked
pub fn render(report: &CoverageReport, debug: bool) -> Result<String> {
    let json = JsonReport {
        passed: report.is_success(),
        total: report.verdicts.len(),
        failed: report.failed().count(),
        verdicts: &report.verdicts,
        debug: debug.then(|| report.debug_transcript()),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
