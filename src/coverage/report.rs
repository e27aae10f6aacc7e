//! Parser for `go tool cover --func` output
//!
//! ```text
//! github.com/example/mod/utils.go:26:	String		100.0%
//! github.com/example/mod/utils.go:48:	parseArgs	31.0%
//! total:					(statements)	38.1%
//! ```

use crate::models::CoverageLine;
use regex::Regex;
use std::num::ParseFloatError;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// A report line that could not be turned into a [`CoverageLine`]
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("expected 3 parts, found {found}, in {line:?}")]
    FieldCount { found: usize, line: String },

    #[error("expected `filename:linenumber:` in {token:?}, in {line:?}")]
    Location { token: String, line: String },

    #[error("could not extract percentage from {token:?}, in {line:?}")]
    PercentageToken { token: String, line: String },

    #[error("failed parsing percentage {token:?}: {source}, in {line:?}")]
    InvalidNumber {
        token: String,
        line: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("percentage {token:?} is not a number, in {line:?}")]
    NotANumber { token: String, line: String },

    #[error("percentage ({value}) < 0, in {line:?}")]
    BelowZero { value: f64, line: String },

    #[error("percentage ({value}) > 100, in {line:?}")]
    AboveHundred { value: f64, line: String },
}

fn location_regex() -> &'static Regex {
    static LOCATION: OnceLock<Regex> = OnceLock::new();
    LOCATION.get_or_init(|| Regex::new(r"^(.+):(\d+):$").expect("valid location regex"))
}

fn is_summary(line: &str) -> bool {
    line.starts_with("total:")
}

fn parse_percentage(token: &str, line: &str) -> Result<f64, ReportError> {
    let number = token
        .strip_suffix('%')
        .ok_or_else(|| ReportError::PercentageToken {
            token: token.to_string(),
            line: line.to_string(),
        })?;

    let value: f64 = number.parse().map_err(|source| ReportError::InvalidNumber {
        token: number.to_string(),
        line: line.to_string(),
        source,
    })?;

    if value.is_nan() {
        return Err(ReportError::NotANumber {
            token: number.to_string(),
            line: line.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ReportError::BelowZero {
            value,
            line: line.to_string(),
        });
    }
    if value > 100.0 {
        return Err(ReportError::AboveHundred {
            value,
            line: line.to_string(),
        });
    }
    Ok(value)
}

/// Parse a single data line, after the module path has been stripped
pub fn parse_coverage_line(line: &str) -> Result<CoverageLine, ReportError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ReportError::FieldCount {
            found: parts.len(),
            line: line.to_string(),
        });
    }

    let location_err = || ReportError::Location {
        token: parts[0].to_string(),
        line: line.to_string(),
    };
    let caps = location_regex().captures(parts[0]).ok_or_else(location_err)?;
    let line_number: u32 = caps[2].parse().map_err(|_| location_err())?;

    Ok(CoverageLine {
        filename: caps[1].to_string(),
        line: line_number,
        function: parts[1].to_string(),
        coverage: parse_percentage(parts[2], line)?,
    })
}

/// Parse the whole report, in order.
///
/// `module_path` (e.g. `github.com/example/mod/`) is stripped from the start
/// of each line so filenames are relative to the module root. Blank lines and
/// the `total:` summary are skipped. Any bad line fails the whole parse.
pub fn parse_coverage_output<S: AsRef<str>>(
    module_path: &str,
    lines: &[S],
) -> Result<Vec<CoverageLine>, ReportError> {
    let parsed = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.trim().is_empty() && !is_summary(l))
        .map(|l| parse_coverage_line(l.strip_prefix(module_path).unwrap_or(l)))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} coverage lines", parsed.len());
    Ok(parsed)
}
