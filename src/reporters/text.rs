//! Text reporter

use crate::coverage::CoverageReport;
use anyhow::Result;
use console::style;

/// One-line summary, after the matching transcript when `debug` is set.
/// Failure details travel through the returned error.
pub fn render(report: &CoverageReport, debug: bool) -> Result<String> {
    let total = report.verdicts.len();
    let failed = report.failed().count();

    let line = if failed == 0 {
        format!(
            "{} {} functions meet their coverage thresholds",
            style("✓").green(),
            style(total).cyan()
        )
    } else {
        format!(
            "{} {} of {} functions below their coverage thresholds",
            style("✗").red(),
            style(failed).red().bold(),
            style(total).cyan()
        )
    };
    if debug {
        Ok(format!("{}{}", report.debug_transcript(), line))
    } else {
        Ok(line)
    }
}
