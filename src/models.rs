//! Core data models for gocov-gate
//!
//! These models describe the two sides of a coverage check: where a Go
//! function is declared, and how much of it the test suite exercised.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Build the `filename:line` key shared by locations and coverage lines.
pub fn location_key(filename: &str, line: u32) -> String {
    format!("{}:{}", filename, line)
}

/// A function or method declaration site in Go source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLocation {
    /// Path relative to the scanned root, `/`-separated
    pub filename: String,
    /// 1-based line of the `func` keyword
    pub line: u32,
    pub function: String,
    /// Bare receiver type name, empty for plain functions
    pub receiver: String,
}

impl FunctionLocation {
    pub fn key(&self) -> String {
        location_key(&self.filename, self.line)
    }

    pub fn is_method(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Lookup from `filename:line` to the declaration found there.
///
/// Built once by the function locator and only read afterwards.
pub type FunctionLocationMap = FxHashMap<String, FunctionLocation>;

/// One per-function measurement from `go tool cover --func`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageLine {
    pub filename: String,
    pub line: u32,
    pub function: String,
    /// Statement coverage in percent, always within 0..=100
    pub coverage: f64,
}

impl CoverageLine {
    pub fn key(&self) -> String {
        location_key(&self.filename, self.line)
    }
}

impl fmt::Display for CoverageLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:\t{}\t{:.1}%",
            self.filename, self.line, self.function, self.coverage
        )
    }
}
