//! Output reporters for coverage check results
//!
//! Supports multiple output formats:
//! - `text` - One-line terminal summary with colors
//! - `json` - Machine-readable JSON with every verdict

mod json;
mod text;

use crate::coverage::CoverageReport;
use anyhow::Result;
use clap::ValueEnum;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a coverage report in the specified format.
///
/// With `debug` the matching transcript is included: as a preamble for text,
/// and as the `debug` field for JSON.
pub fn report_with_format(report: &CoverageReport, format: OutputFormat, debug: bool) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report, debug),
        OutputFormat::Json => json::render(report, debug),
    }
}
