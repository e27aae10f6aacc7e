//! gocov-gate - per-function Go coverage thresholds for pre-commit

use clap::Parser;
use gocov_gate::cli::{self, Cli};
use gocov_gate::gotool::SystemRunner;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let runner = SystemRunner {
        cwd: None,
        timeout_secs: cli.timeout,
    };
    let outcome = cli::run(&cli, &runner);
    let code = cli::print_outcome(&outcome, &mut std::io::stdout(), &mut std::io::stderr());
    std::process::exit(code);
}
