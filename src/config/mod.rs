//! Configuration module for gocov-gate
//!
//! This module handles:
//! - The YAML rule configuration (`.golang-coverage-pre-commit.yaml`)
//! - Validation and regex compilation of rules
//! - The example config and config generation from current coverage

mod generate;
mod rule_config;

pub use generate::{generate_config, make_example_config, render_config};
pub use rule_config::{
    load_config, parse_yaml_config, validate_config, CompiledRule, Config, ConfigError, Rule,
    ValidatedConfig, DEFAULT_CONFIG_FILE,
};
