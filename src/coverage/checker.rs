//! Rule matching
//!
//! Each coverage line is matched against the rules in declared order; the
//! first match sets the required coverage, otherwise the default applies.
//! Every line gets a [`Verdict`], so the caller can both report all failures
//! at once and print a transcript of every decision.

use crate::config::{Rule, ValidatedConfig};
use crate::models::{CoverageLine, FunctionLocationMap};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// The rule that set a line's threshold
#[derive(Debug, Clone, Serialize)]
pub struct MatchedRule {
    /// Position in the config's rule list
    pub index: usize,
    pub rule: Rule,
}

/// Outcome of evaluating one coverage line
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub line: CoverageLine,
    /// Receiver type used for matching, empty if unknown or a plain function
    pub receiver: String,
    /// `None` when the default coverage applied
    pub matched_rule: Option<MatchedRule>,
    pub required: f64,
    pub satisfied: bool,
}

impl Verdict {
    /// Failure text for this line, `None` if it passed
    pub fn failure_message(&self) -> Option<String> {
        if self.satisfied {
            return None;
        }
        Some(match &self.matched_rule {
            Some(m) => format!(
                "{}: actual coverage {:.1}% < required coverage {:.1}%: matching rule is `{}`",
                self.line, self.line.coverage, self.required, m.rule
            ),
            None => format!(
                "{}: actual coverage {:.1}% < default coverage {:.1}%",
                self.line, self.line.coverage, self.required
            ),
        })
    }

    fn write_debug(&self, out: &mut String) {
        out.push_str(&format!("Line {}\n", self.line));
        match &self.matched_rule {
            Some(m) => {
                out.push_str(&format!("Matching rule: {}\n", m.rule));
                if self.satisfied {
                    out.push_str(&format!(
                        "Rule satisfied: actual coverage {:.1}% >= required coverage {:.1}%\n",
                        self.line.coverage, self.required
                    ));
                } else {
                    out.push_str(&format!(
                        "Rule not satisfied: actual coverage {:.1}% < required coverage {:.1}%\n",
                        self.line.coverage, self.required
                    ));
                }
            }
            None => {
                let phrase = if self.satisfied { "satisfied" } else { "not satisfied" };
                out.push_str(&format!(
                    "Default coverage {:.1}% {}\n",
                    self.required, phrase
                ));
            }
        }
    }
}

/// Every line that fell short of its threshold, in report order
#[derive(Error, Debug)]
#[error("{}", .failures.join("\n"))]
pub struct CoverageViolations {
    pub failures: Vec<String>,
}

/// All verdicts for one run, in report order
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub verdicts: Vec<Verdict>,
}

impl CoverageReport {
    pub fn failed(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| !v.satisfied)
    }

    pub fn is_success(&self) -> bool {
        self.verdicts.iter().all(|v| v.satisfied)
    }

    /// `Ok` if every line met its threshold, otherwise all failures together
    pub fn result(&self) -> Result<(), CoverageViolations> {
        let failures: Vec<String> = self.failed().filter_map(Verdict::failure_message).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoverageViolations { failures })
        }
    }

    /// Human-readable account of every matching decision
    pub fn debug_transcript(&self) -> String {
        let mut out = String::from("Debug info for coverage matching:\n");
        for verdict in &self.verdicts {
            verdict.write_debug(&mut out);
        }
        out
    }
}

fn evaluate(config: &ValidatedConfig, line: &CoverageLine, locations: &FunctionLocationMap) -> Verdict {
    let receiver = locations
        .get(&line.key())
        .map(|loc| loc.receiver.clone())
        .unwrap_or_default();

    let matched_rule = config
        .rules
        .iter()
        .position(|r| r.matches(&line.filename, &line.function, &receiver))
        .map(|index| MatchedRule {
            index,
            rule: config.rules[index].rule.clone(),
        });

    let required = matched_rule
        .as_ref()
        .map_or(config.default_coverage, |m| m.rule.coverage);

    Verdict {
        satisfied: line.coverage >= required,
        line: line.clone(),
        receiver,
        matched_rule,
        required,
    }
}

/// Coverage lines whose `file:line` the locator never saw
fn unlocated_lines(coverage: &[CoverageLine], locations: &FunctionLocationMap) -> usize {
    coverage
        .iter()
        .filter(|line| !locations.contains_key(&line.key()))
        .count()
}

/// Evaluate every coverage line against the config.
///
/// Lines are independent, so they are evaluated in parallel; verdicts keep
/// report order.
pub fn check_coverage(
    config: &ValidatedConfig,
    coverage: &[CoverageLine],
    locations: &FunctionLocationMap,
) -> CoverageReport {
    let verdicts: Vec<Verdict> = coverage
        .par_iter()
        .map(|line| evaluate(config, line, locations))
        .collect();

    let unlocated = unlocated_lines(coverage, locations);
    if unlocated > 0 {
        warn!(
            "{} of {} coverage lines have no declaration under the scanned directory; \
             receiver rules cannot match them",
            unlocated,
            coverage.len()
        );
    }

    let report = CoverageReport { verdicts };
    debug!(
        "Checked {} functions, {} below threshold",
        report.verdicts.len(),
        report.failed().count()
    );
    report
}
