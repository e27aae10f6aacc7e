//! gocov-gate - per-function Go test coverage gate
//!
//! Parses `go tool cover --func` output, resolves each function's receiver
//! type from the Go sources, and checks every function against an ordered
//! list of regex rules with a default fallback.

pub mod cli;
pub mod config;
pub mod coverage;
pub mod gotool;
pub mod models;
pub mod parsers;
pub mod reporters;

use coverage::{parse_coverage_output, ReportError};
use models::{CoverageLine, FunctionLocationMap};
use parsers::{locate_functions, ScanError};
use std::path::Path;
use thiserror::Error;

/// Structural failures; any of these stops the run before checking
#[derive(Error, Debug)]
pub enum GateError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Everything the rule matcher needs besides the config
#[derive(Debug, Clone)]
pub struct CheckInputs {
    pub coverage: Vec<CoverageLine>,
    pub locations: FunctionLocationMap,
}

/// Locate functions under `source_dir`, then parse the coverage report
pub fn prepare_inputs<S: AsRef<str>>(
    source_dir: &Path,
    module_path: &str,
    report_lines: &[S],
) -> Result<CheckInputs, GateError> {
    let locations = locate_functions(source_dir)?;
    let coverage = parse_coverage_output(module_path, report_lines)?;
    Ok(CheckInputs {
        coverage,
        locations,
    })
}
