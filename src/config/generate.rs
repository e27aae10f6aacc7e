//! Example config and config generation
//!
//! `--example-config` prints a documented starting point; `--generate-config`
//! pins every function at its current coverage so a legacy codebase can adopt
//! the gate without failing on day one.

use super::rule_config::{Config, ConfigError, Rule};
use crate::models::{location_key, CoverageLine, FunctionLocationMap};

fn example_rule(comment: &str, filename: &str, function: &str, receiver: &str, coverage: f64) -> Rule {
    Rule {
        comment: comment.to_string(),
        filename_regex: filename.to_string(),
        function_regex: function.to_string(),
        receiver_regex: receiver.to_string(),
        coverage,
    }
}

/// YAML text of an example config showing each kind of rule
pub fn make_example_config() -> Result<String, ConfigError> {
    let config = Config {
        comment: "Comment is not interpreted or used; it is provided as a structured way of \
                  adding comments to a config, so that automated editing is easier."
            .to_string(),
        default_coverage: 80.0,
        rules: vec![
            example_rule("Low coverage is acceptable for main()", "", "^main$", "", 50.0),
            example_rule(
                "All the fooOrDie() functions should be fully tested because they panic() on failure",
                "",
                "OrDie$",
                "",
                100.0,
            ),
            example_rule(
                "TODO: improve test coverage for parse_json.go",
                "^parse_json.go$",
                "",
                "",
                73.0,
            ),
            example_rule("Full coverage for other parsers", "^parse.*.go$", "", "", 100.0),
            example_rule("Url.String() has low coverage", "^urls.go$", "^String$", "^Url$", 56.0),
            example_rule(
                "String() everywhere else should have high coverage",
                "",
                "^String$",
                "",
                100.0,
            ),
        ],
    };
    render_config(&config)
}

/// Serialize a config back to YAML
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml_ng::to_string(config)?)
}

/// Build a config that every function currently passes.
///
/// The receiver is pinned too when the locator found one, so methods sharing
/// a name in one file get separate rules.
pub fn generate_config(coverage: &[CoverageLine], locations: &FunctionLocationMap) -> Config {
    let rules = coverage
        .iter()
        .map(|line| {
            let receiver = locations
                .get(&location_key(&line.filename, line.line))
                .filter(|loc| loc.is_method())
                .map(|loc| format!("^{}$", regex::escape(&loc.receiver)))
                .unwrap_or_default();

            Rule {
                comment: format!(
                    "Generated rule for {}, found at {}:{}",
                    line.function, line.filename, line.line
                ),
                filename_regex: format!("^{}$", regex::escape(&line.filename)),
                function_regex: format!("^{}$", regex::escape(&line.function)),
                receiver_regex: receiver,
                coverage: line.coverage,
            }
        })
        .collect();

    Config {
        comment: String::new(),
        default_coverage: 100.0,
        rules,
    }
}
