//! Coverage report parsing and rule checking

mod checker;
mod report;

pub use checker::{check_coverage, CoverageReport, CoverageViolations, MatchedRule, Verdict};
pub use report::{parse_coverage_line, parse_coverage_output, ReportError};
