//! Rule configuration support
//!
//! # Configuration Format
//!
//! ```yaml
//! # .golang-coverage-pre-commit.yaml
//! default_coverage: 80
//! rules:
//!   - comment: Low coverage is acceptable for main()
//!     function_regex: ^main$
//!     coverage: 50
//!   - comment: Url.String() has low coverage
//!     filename_regex: ^urls.go$
//!     function_regex: ^String$
//!     receiver_regex: ^Url$
//!     coverage: 56
//! ```
//!
//! Rules are tried in order and the first match decides the threshold.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = ".golang-coverage-pre-commit.yaml";

/// Errors found while parsing or validating a config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed parsing YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("default coverage ({0:.1}) is outside the range 0-100")]
    DefaultCoverageRange(f64),

    #[error("coverage ({coverage:.1}) is outside the range 0-100 in rule `{rule}`")]
    RuleCoverageRange { coverage: f64, rule: String },

    #[error("every regex is an empty string in rule `{0}`")]
    EmptyRule(String),

    #[error("invalid {field} {pattern:?} in rule `{rule}`: {source}")]
    InvalidRegex {
        field: &'static str,
        pattern: String,
        rule: String,
        #[source]
        source: regex::Error,
    },
}

/// One matching unit: up to three patterns and the threshold they impose
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Free text, never interpreted
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub filename_regex: String,
    #[serde(default)]
    pub function_regex: String,
    #[serde(default)]
    pub receiver_regex: String,
    #[serde(default)]
    pub coverage: f64,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilenameRegex: {} FunctionRegex: {} ReceiverRegex: {} Coverage: {} Comment: {}",
            self.filename_regex, self.function_regex, self.receiver_regex, self.coverage, self.comment
        )
    }
}

/// The raw rule configuration, as written by users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Free text, never interpreted
    #[serde(default)]
    pub comment: String,
    /// Threshold applied when no rule matches
    #[serde(default)]
    pub default_coverage: f64,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A rule with its non-empty patterns compiled.
///
/// `None` means the dimension is unconstrained.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub filename: Option<Regex>,
    pub function: Option<Regex>,
    pub receiver: Option<Regex>,
}

impl CompiledRule {
    /// True when every constrained dimension matches
    pub fn matches(&self, filename: &str, function: &str, receiver: &str) -> bool {
        let dimension = |pattern: &Option<Regex>, value: &str| {
            pattern.as_ref().map_or(true, |re| re.is_match(value))
        };
        dimension(&self.filename, filename)
            && dimension(&self.function, function)
            && dimension(&self.receiver, receiver)
    }
}

/// A config that passed validation; immutable for the rest of the run
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub default_coverage: f64,
    pub rules: Vec<CompiledRule>,
}

fn in_range(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

fn compile(field: &'static str, pattern: &str, rule: &Rule) -> Result<Option<Regex>, ConfigError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| ConfigError::InvalidRegex {
            field,
            pattern: pattern.to_string(),
            rule: rule.to_string(),
            source,
        })
}

/// Check ranges and patterns, and compile every rule.
///
/// Stops at the first violation.
pub fn validate_config(config: Config) -> Result<ValidatedConfig, ConfigError> {
    if !in_range(config.default_coverage) {
        return Err(ConfigError::DefaultCoverageRange(config.default_coverage));
    }

    let mut rules = Vec::with_capacity(config.rules.len());
    for rule in config.rules {
        if !in_range(rule.coverage) {
            return Err(ConfigError::RuleCoverageRange {
                coverage: rule.coverage,
                rule: rule.to_string(),
            });
        }
        if rule.filename_regex.is_empty()
            && rule.function_regex.is_empty()
            && rule.receiver_regex.is_empty()
        {
            return Err(ConfigError::EmptyRule(rule.to_string()));
        }

        rules.push(CompiledRule {
            filename: compile("filename_regex", &rule.filename_regex, &rule)?,
            function: compile("function_regex", &rule.function_regex, &rule)?,
            receiver: compile("receiver_regex", &rule.receiver_regex, &rule)?,
            rule,
        });
    }

    Ok(ValidatedConfig {
        default_coverage: config.default_coverage,
        rules,
    })
}

/// Parse YAML text into a validated config
pub fn parse_yaml_config(yaml: &str) -> Result<ValidatedConfig, ConfigError> {
    // An empty document means "all defaults"
    let config = if yaml.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_ng::from_str::<Config>(yaml)?
    };
    validate_config(config)
}

/// Read, parse and validate the config file at `path`
pub fn load_config(path: &Path) -> anyhow::Result<ValidatedConfig> {
    use anyhow::Context;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading config {}", path.display()))?;
    let config = parse_yaml_config(&content)
        .with_context(|| format!("failed parsing config {}", path.display()))?;

    debug!(
        "Loaded config from {} ({} rules, default coverage {:.1}%)",
        path.display(),
        config.rules.len(),
        config.default_coverage
    );
    Ok(config)
}
