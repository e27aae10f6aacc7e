//! CLI definition and run orchestration

use crate::config::{generate_config, load_config, make_example_config, render_config, DEFAULT_CONFIG_FILE};
use crate::coverage::check_coverage;
use crate::gotool::{go_cover, read_module_path, CommandRunner, GoCoverOptions};
use crate::reporters::{report_with_format, OutputFormat};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// gocov-gate - per-function Go coverage thresholds for pre-commit
#[derive(Parser, Debug)]
#[command(name = "gocov-gate", args_override_self = true)]
#[command(
    version,
    about = "Fail a commit when any Go function's test coverage drops below its configured threshold",
    after_help = "\
Examples:
  gocov-gate                               Check coverage using .golang-coverage-pre-commit.yaml
  gocov-gate --example-config              Print an example config
  gocov-gate --generate-config > cfg.yaml  Pin every function at its current coverage
  gocov-gate --debug-matching              Explain which rule applied to each function
  gocov-gate --format json                 JSON verdicts for scripting"
)]
pub struct Cli {
    /// Rule configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// go.mod used to find the module path stripped from report filenames
    #[arg(long, default_value = "go.mod")]
    pub go_mod: PathBuf,

    /// Directory scanned for function and method declarations
    /// [default: the directory containing --go-mod]
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Package patterns passed to `go test` (repeatable)
    #[arg(long = "package", default_value = "./...")]
    pub packages: Vec<String>,

    /// Print an example config and exit
    #[arg(long, alias = "example_config")]
    pub example_config: bool,

    /// Print a config matching current coverage and exit
    #[arg(long, alias = "generate_config", conflicts_with = "example_config")]
    pub generate_config: bool,

    /// Print how every function was matched against the rules
    #[arg(long, alias = "debug_matching")]
    pub debug_matching: bool,

    /// Open the HTML coverage report in a browser
    #[arg(long)]
    pub browser: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Timeout in seconds for each go command (0 = no timeout)
    #[arg(long, default_value = "0")]
    pub timeout: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

/// What a run produced: text for stdout, and whether the gate passed
#[derive(Debug)]
pub struct Outcome {
    pub output: String,
    pub result: Result<()>,
}

impl Outcome {
    fn failed(err: anyhow::Error) -> Self {
        Self {
            output: String::new(),
            result: Err(err),
        }
    }
}

impl Cli {
    /// Where to look for Go sources.
    ///
    /// Report filenames are relative to the module root, so the scan defaults
    /// to the directory holding go.mod.
    pub fn source_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        match self.go_mod.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Run tests with coverage behind a spinner
fn run_go_cover(cli: &Cli, runner: &dyn CommandRunner) -> Result<Vec<String>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(create_spinner_style());
    spinner.set_message("Running go test with coverage...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let options = GoCoverOptions {
        packages: cli.packages.clone(),
        browser: cli.browser,
    };
    let lines = go_cover(runner, &options);
    spinner.finish_and_clear();

    lines.context("failed running go coverage")
}

/// Run the gate end to end.
///
/// Structural problems (bad config, unparsable source or report, go tool
/// failure) abort before any checking. Coverage violations still produce
/// output, such as the debug transcript, alongside the error.
pub fn run(cli: &Cli, runner: &dyn CommandRunner) -> Outcome {
    if cli.example_config {
        return match make_example_config() {
            Ok(output) => Outcome {
                output,
                result: Ok(()),
            },
            Err(e) => Outcome::failed(e.into()),
        };
    }

    match prepare_and_check(cli, runner) {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failed(e),
    }
}

fn prepare_and_check(cli: &Cli, runner: &dyn CommandRunner) -> Result<Outcome> {
    let config = if cli.generate_config {
        None
    } else {
        Some(load_config(&cli.config)?)
    };
    let module_path = read_module_path(&cli.go_mod)?;

    let lines = run_go_cover(cli, runner)?;
    let inputs = crate::prepare_inputs(&cli.source_dir(), &module_path, &lines)?;

    let Some(config) = config else {
        let generated = generate_config(&inputs.coverage, &inputs.locations);
        return Ok(Outcome {
            output: render_config(&generated)?,
            result: Ok(()),
        });
    };

    let report = check_coverage(&config, &inputs.coverage, &inputs.locations);
    info!(
        "{} of {} functions below threshold",
        report.failed().count(),
        report.verdicts.len()
    );

    let output = report_with_format(&report, cli.format, cli.debug_matching)?;

    Ok(Outcome {
        output,
        result: report.result().map_err(anyhow::Error::from),
    })
}

/// Print an outcome and return the process exit code
pub fn print_outcome(outcome: &Outcome, stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    if !outcome.output.is_empty() {
        let _ = writeln!(stdout, "{}", outcome.output.trim_end());
    }
    match &outcome.result {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(stderr, "{:#}", e);
            1
        }
    }
}
