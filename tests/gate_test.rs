//! End-to-end tests for the coverage gate
//!
//! These drive `cli::run` against the Go fixture project with a fake go
//! tool, so no Go toolchain is needed:
//! - function locations come from the real fixture sources
//! - receivers disambiguate same-named methods
//! - config generation round-trips into a passing check

use clap::Parser;
use gocov_gate::cli::{run, Cli, Outcome};
use gocov_gate::gotool::{CommandRunner, GoToolError};
use gocov_gate::parsers::locate_functions;
use std::path::PathBuf;

/// Path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn project_path() -> PathBuf {
    fixtures_path().join("project")
}

const REPORT: &str = "\
example.com/greeter/greeter.go:12:\t\tGreet\t\t\t100.0%
example.com/greeter/greeter.go:17:\t\tString\t\t\t85.0%
example.com/greeter/greeter.go:22:\t\tShout\t\t\t90.0%
example.com/greeter/greeter.go:26:\t\tMustGreetOrDie\t\t75.0%
example.com/greeter/urls/urls.go:11:\tString\t\t\t50.0%
example.com/greeter/urls/urls.go:15:\tString\t\t\t60.0%
total:\t\t\t\t\t\t(statements)\t\t78.3%
";

/// Answers `go tool cover --func` with a canned report
struct FakeGo {
    report: Vec<String>,
    fail_with: Option<String>,
}

impl FakeGo {
    fn new(report: &str) -> Self {
        Self {
            report: report.lines().map(String::from).collect(),
            fail_with: None,
        }
    }
}

impl CommandRunner for FakeGo {
    fn capture_output(&self, program: &str, args: &[String]) -> Result<Vec<String>, GoToolError> {
        assert_eq!(program, "go");
        if let Some(stderr) = &self.fail_with {
            return Err(GoToolError::Failed {
                command: format!("go {}", args.join(" ")),
                status: "exit status: 1".to_string(),
                output: stderr.clone(),
            });
        }
        if args.starts_with(&["tool".to_string(), "cover".to_string(), "--func".to_string()]) {
            return Ok(self.report.clone());
        }
        Ok(Vec::new())
    }
}

fn run_in_project(extra: &[&str], go: &FakeGo) -> Outcome {
    let project = project_path();
    let mut args: Vec<String> = vec![
        "gocov-gate".to_string(),
        "--dir".to_string(),
        project.display().to_string(),
        "--go-mod".to_string(),
        project.join("go.mod").display().to_string(),
        "--config".to_string(),
        project.join(".golang-coverage-pre-commit.yaml").display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    let cli = Cli::parse_from(args);
    run(&cli, go)
}

fn error_text(outcome: &Outcome) -> String {
    match &outcome.result {
        Ok(()) => panic!("expected failure, output was {:?}", outcome.output),
        Err(e) => format!("{:#}", e),
    }
}

#[test]
fn test_locate_functions_in_fixture_project() {
    let map = locate_functions(&project_path()).expect("fixture project parses");

    assert_eq!(map.len(), 6);

    let greet = &map["greeter.go:12"];
    assert_eq!(greet.function, "Greet");
    assert_eq!(greet.receiver, "");

    assert_eq!(map["greeter.go:17"].receiver, "Greeter");
    assert_eq!(map["greeter.go:22"].receiver, "Greeter");
    assert_eq!(map["urls/urls.go:11"].receiver, "Url");
    assert_eq!(map["urls/urls.go:15"].receiver, "Path");
    assert_eq!(map["urls/urls.go:15"].function, "String");
}

#[test]
fn test_check_reports_every_violation() {
    let outcome = run_in_project(&[], &FakeGo::new(REPORT));
    let err = error_text(&outcome);

    assert!(
        err.contains(
            "greeter.go:26:\tMustGreetOrDie\t75.0%: actual coverage 75.0% < required coverage 100.0%: matching rule is `FilenameRegex:  FunctionRegex: OrDie$ ReceiverRegex:  Coverage: 100 Comment: Panicking helpers must be fully tested`"
        ),
        "{}",
        err
    );
    assert!(
        err.contains("urls/urls.go:15:\tString\t60.0%: actual coverage 60.0% < default coverage 80.0%"),
        "{}",
        err
    );
    // Url.String() is covered by its own rule
    assert!(!err.contains("urls/urls.go:11:"), "{}", err);
    assert_eq!(err.lines().count(), 2, "{}", err);
}

#[test]
fn test_debug_matching_output_survives_failure() {
    let outcome = run_in_project(&["--debug-matching"], &FakeGo::new(REPORT));

    assert!(outcome.result.is_err());
    let out = &outcome.output;
    assert!(out.contains("Debug info for coverage matching"));
    assert!(out.contains(
        "Line urls/urls.go:11:\tString\t50.0%\nMatching rule: FilenameRegex: ^urls/urls.go$ FunctionRegex: ^String$ ReceiverRegex: ^Url$ Coverage: 50"
    ));
    assert!(out.contains("Line urls/urls.go:15:\tString\t60.0%\nDefault coverage 80.0% not satisfied"));
    assert!(out.contains("Line greeter.go:12:\tGreet\t100.0%\nDefault coverage 80.0% satisfied"));
    assert_eq!(out.matches("\nLine ").count() + out.starts_with("Line ") as usize, 6);
}

#[test]
fn test_json_output() {
    let outcome = run_in_project(&["--format", "json"], &FakeGo::new(REPORT));

    assert!(outcome.result.is_err());
    let parsed: serde_json::Value = serde_json::from_str(&outcome.output).expect("valid JSON");
    assert_eq!(parsed["total"], 6);
    assert_eq!(parsed["failed"], 2);
    assert_eq!(parsed["verdicts"][4]["receiver"], "Url");
    assert_eq!(parsed["verdicts"][4]["matched_rule"]["index"], 0);
}

#[test]
fn test_json_output_with_debug_matching_stays_json() {
    let outcome = run_in_project(&["--format", "json", "--debug-matching"], &FakeGo::new(REPORT));

    assert!(outcome.result.is_err());
    let parsed: serde_json::Value = serde_json::from_str(&outcome.output).expect("valid JSON");
    assert_eq!(parsed["failed"], 2);
    let debug = parsed["debug"].as_str().expect("transcript in debug field");
    assert!(debug.starts_with("Debug info for coverage matching:"));
    assert!(debug.contains("Line urls/urls.go:15:\tString\t60.0%\nDefault coverage 80.0% not satisfied"));
}

#[test]
fn test_sources_default_to_go_mod_directory() {
    let project = project_path();
    let cli = Cli::parse_from([
        "gocov-gate".to_string(),
        "--go-mod".to_string(),
        project.join("go.mod").display().to_string(),
        "--config".to_string(),
        project.join(".golang-coverage-pre-commit.yaml").display().to_string(),
        "--format".to_string(),
        "json".to_string(),
    ]);
    assert_eq!(cli.source_dir(), project);

    let outcome = run(&cli, &FakeGo::new(REPORT));
    let parsed: serde_json::Value = serde_json::from_str(&outcome.output).expect("valid JSON");
    // Receivers were found, so Url.String() hit its own rule
    assert_eq!(parsed["verdicts"][4]["receiver"], "Url");
    assert_eq!(parsed["verdicts"][4]["matched_rule"]["index"], 0);
    assert_eq!(parsed["failed"], 2);
}

#[test]
fn test_passing_report() {
    let report = "\
example.com/greeter/greeter.go:12:\tGreet\t100.0%
example.com/greeter/greeter.go:26:\tMustGreetOrDie\t100.0%
example.com/greeter/urls/urls.go:11:\tString\t50.0%
total:\t(statements)\t90.0%
";
    console::set_colors_enabled(false);
    let outcome = run_in_project(&[], &FakeGo::new(report));
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    assert!(outcome.output.contains("3 functions meet"), "{}", outcome.output);
}

#[test]
fn test_generated_config_passes_current_coverage() {
    let outcome = run_in_project(&["--generate-config"], &FakeGo::new(REPORT));
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);

    let yaml = &outcome.output;
    assert!(yaml.contains("default_coverage: 100"), "{}", yaml);
    assert!(yaml.contains("Generated rule for MustGreetOrDie, found at greeter.go:26"));
    assert!(yaml.contains("^Path$"), "{}", yaml);
    assert!(yaml.contains("^Greeter$"), "{}", yaml);

    let dir = tempfile::tempdir().unwrap();
    let generated = dir.path().join("generated.yaml");
    std::fs::write(&generated, yaml).unwrap();

    let outcome = run_in_project(
        &["--config", generated.to_str().unwrap()],
        &FakeGo::new(REPORT),
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
}

#[test]
fn test_structural_failures() {
    let bad_config = fixtures_path().join("bad-config.yaml");
    let outcome = run_in_project(
        &["--config", bad_config.to_str().unwrap()],
        &FakeGo::new(REPORT),
    );
    let err = error_text(&outcome);
    assert!(err.contains("failed parsing config"), "{}", err);
    assert!(err.contains("every regex is an empty string"), "{}", err);

    let outcome = run_in_project(&["--go-mod", "go-mod-does-not-exist"], &FakeGo::new(REPORT));
    assert!(error_text(&outcome).contains("failed reading go-mod-does-not-exist"));

    let outcome = run_in_project(&[], &FakeGo::new("qwerty\n"));
    assert!(error_text(&outcome).contains("expected 3 parts, found 1, in \"qwerty\""));
    assert!(outcome.output.is_empty());

    let mut failing = FakeGo::new(REPORT);
    failing.fail_with = Some("forced go test failure".to_string());
    let outcome = run_in_project(&[], &failing);
    let err = error_text(&outcome);
    assert!(err.contains("failed running go coverage"), "{}", err);
    assert!(err.contains("forced go test failure"), "{}", err);

    let outcome = run_in_project(&["--dir", "does-not-exist"], &FakeGo::new(REPORT));
    assert!(error_text(&outcome).contains("does-not-exist"));
}
