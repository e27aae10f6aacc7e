//! Running the go tool
//!
//! Coverage numbers come from two subprocesses:
//! 1. `go test --covermode set --coverprofile <tmp> <packages>`
//! 2. `go tool cover --func <tmp>` (and optionally `--html <tmp>`)
//!
//! Commands go through [`CommandRunner`] so tests can fake the go tool.

use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from invoking external commands
#[derive(Error, Debug)]
pub enum GoToolError {
    #[error("{program} not found. Please install it first.")]
    NotFound { program: String },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {output}")]
    Failed {
        command: String,
        status: String,
        /// Captured stdout then stderr; `go test` reports failing tests on stdout
        output: String,
    },

    #[error("`{command}` timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },

    #[error("failed creating coverage profile: {0}")]
    TempFile(#[source] std::io::Error),
}

/// Runs a command and returns its stdout split into lines
pub trait CommandRunner {
    fn capture_output(&self, program: &str, args: &[String]) -> Result<Vec<String>, GoToolError>;
}

/// Runs real subprocesses
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Working directory, `None` for the current one
    pub cwd: Option<PathBuf>,
    /// Per-command timeout in seconds, 0 for none
    pub timeout_secs: u64,
}

fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Join whatever a failed command printed, skipping empty streams
fn failure_output(stdout: &str, stderr: &str) -> String {
    [stdout.trim_end(), stderr.trim_end()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl SystemRunner {
    /// Wait for the child, killing it once the timeout passes
    fn wait(
        &self,
        child: &mut Child,
        command: &str,
    ) -> Result<std::process::ExitStatus, GoToolError> {
        let spawn_err = |source| GoToolError::Spawn {
            command: command.to_string(),
            source,
        };

        if self.timeout_secs == 0 {
            return child.wait().map_err(spawn_err);
        }

        let start = Instant::now();
        let timeout = Duration::from_secs(self.timeout_secs);
        loop {
            match child.try_wait().map_err(spawn_err)? {
                Some(status) => return Ok(status),
                None if start.elapsed() > timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!("{} timed out after {}s", command, self.timeout_secs);
                    return Err(GoToolError::TimedOut {
                        command: command.to_string(),
                        secs: self.timeout_secs,
                    });
                }
                None => thread::sleep(Duration::from_millis(100)),
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn capture_output(&self, program: &str, args: &[String]) -> Result<Vec<String>, GoToolError> {
        let command = render_command(program, args);
        debug!("Running {}", command);

        let mut cmd = Command::new(program);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                GoToolError::NotFound {
                    program: program.to_string(),
                }
            } else {
                GoToolError::Spawn {
                    command: command.clone(),
                    source,
                }
            }
        })?;

        // Drain both pipes while waiting
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child, &command)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(GoToolError::Failed {
                command,
                status: status.to_string(),
                output: failure_output(&stdout, &stderr),
            });
        }

        Ok(stdout.lines().map(String::from).collect())
    }
}

/// What to run `go test` on
#[derive(Debug, Clone)]
pub struct GoCoverOptions {
    /// Package patterns passed to `go test`
    pub packages: Vec<String>,
    /// Also open the HTML coverage view
    pub browser: bool,
}

impl Default for GoCoverOptions {
    fn default() -> Self {
        Self {
            packages: vec!["./...".to_string()],
            browser: false,
        }
    }
}

/// Run the tests with coverage and return `go tool cover --func` output.
///
/// Any failing step aborts with no lines returned.
pub fn go_cover(runner: &dyn CommandRunner, options: &GoCoverOptions) -> Result<Vec<String>, GoToolError> {
    let profile = tempfile::Builder::new()
        .prefix("gocov-gate-")
        .suffix(".out")
        .tempfile()
        .map_err(GoToolError::TempFile)?;
    let profile_path = profile.path().to_string_lossy().into_owned();

    let args = |prefix: &[&str]| -> Vec<String> {
        prefix
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(profile_path.clone()))
            .collect()
    };

    let mut test_args = args(&["test", "--covermode", "set", "--coverprofile"]);
    test_args.extend(options.packages.iter().cloned());
    runner.capture_output("go", &test_args)?;

    if options.browser {
        runner.capture_output("go", &args(&["tool", "cover", "--html"]))?;
    }

    let lines = runner.capture_output("go", &args(&["tool", "cover", "--func"]))?;
    debug!("go tool cover reported {} lines", lines.len());
    Ok(lines)
}

/// Module path from `go.mod`, with a trailing `/` so it can be stripped
/// from report filenames.
pub fn read_module_path(go_mod: &Path) -> anyhow::Result<String> {
    let content = std::fs::read_to_string(go_mod)
        .with_context(|| format!("failed reading {}", go_mod.display()))?;

    for line in content.lines() {
        let Some(rest) = line.trim().strip_prefix("module") else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let module = rest.split("//").next().unwrap_or("").trim().trim_matches('"');
        if !module.is_empty() {
            return Ok(format!("{}/", module));
        }
    }

    anyhow::bail!("no module directive in {}", go_mod.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Fake go tool keyed by the args minus the trailing profile path
    #[derive(Default)]
    struct FakeRunner {
        outputs: HashMap<String, Vec<String>>,
        failures: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn with_output(mut self, key: &str, lines: &[&str]) -> Self {
            self.outputs
                .insert(key.to_string(), lines.iter().map(|s| s.to_string()).collect());
            self
        }

        fn with_failure(mut self, key: &str, stderr: &str) -> Self {
            self.failures.insert(key.to_string(), stderr.to_string());
            self
        }
    }

    impl CommandRunner for FakeRunner {
        fn capture_output(&self, program: &str, args: &[String]) -> Result<Vec<String>, GoToolError> {
            let profile_at = args.iter().position(|a| a.ends_with(".out")).unwrap_or(args.len());
            let key = args[..profile_at].join(" ");
            self.calls.borrow_mut().push(key.clone());
            if let Some(stderr) = self.failures.get(&key) {
                return Err(GoToolError::Failed {
                    command: format!("{} {}", program, key),
                    status: "exit status: 1".to_string(),
                    output: stderr.clone(),
                });
            }
            Ok(self.outputs.get(&key).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_go_cover_success() {
        let runner = FakeRunner::default()
            .with_output("test --covermode set --coverprofile", &["ok"])
            .with_output("tool cover --func", &["expected return value"]);

        let lines = go_cover(&runner, &GoCoverOptions::default()).unwrap();

        assert_eq!(lines, vec!["expected return value"]);
        assert_eq!(
            *runner.calls.borrow(),
            vec!["test --covermode set --coverprofile", "tool cover --func"]
        );
    }

    #[test]
    fn test_go_cover_browser() {
        let runner = FakeRunner::default().with_output("tool cover --func", &["expected"]);
        let options = GoCoverOptions {
            browser: true,
            ..Default::default()
        };

        let lines = go_cover(&runner, &options).unwrap();

        assert_eq!(lines, vec!["expected"]);
        assert_eq!(runner.calls.borrow().len(), 3);
        assert!(runner.calls.borrow().contains(&"tool cover --html".to_string()));
    }

    #[test]
    fn test_go_cover_browser_failure_stops_before_func() {
        let runner = FakeRunner::default().with_failure("tool cover --html", "browser error");
        let options = GoCoverOptions {
            browser: true,
            ..Default::default()
        };

        let err = go_cover(&runner, &options).unwrap_err();

        assert!(err.to_string().contains("browser error"));
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_go_cover_test_failure() {
        let runner = FakeRunner::default()
            .with_failure("test --covermode set --coverprofile", "error for testing");
        let err = go_cover(&runner, &GoCoverOptions::default()).unwrap_err();
        assert!(err.to_string().contains("error for testing"));
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_system_runner_captures_stderr_on_failure() {
        let runner = SystemRunner::default();
        let err = runner
            .capture_output("cat", &["/non-existent".to_string()])
            .unwrap_err();
        assert!(
            err.to_string().contains("/non-existent: No such file or directory"),
            "{}",
            err
        );
    }

    #[test]
    fn test_system_runner_keeps_stdout_on_failure() {
        let runner = SystemRunner::default();
        let err = runner
            .capture_output(
                "sh",
                &[
                    "-c".to_string(),
                    "echo '--- FAIL: TestGreet'; echo 'FAIL example.com/greeter' >&2; exit 1".to_string(),
                ],
            )
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--- FAIL: TestGreet"), "{}", msg);
        assert!(msg.contains("FAIL example.com/greeter"), "{}", msg);
        assert!(matches!(err, GoToolError::Failed { .. }));
    }

    #[test]
    fn test_failure_output() {
        assert_eq!(failure_output("", "boom\n"), "boom");
        assert_eq!(failure_output("--- FAIL\n", ""), "--- FAIL");
        assert_eq!(failure_output("out\n", "err\n"), "out\nerr");
        assert_eq!(failure_output("", ""), "");
    }

    #[test]
    fn test_system_runner_success_and_missing_program() {
        let runner = SystemRunner {
            timeout_secs: 30,
            ..Default::default()
        };
        let lines = runner.capture_output("cat", &["/etc/passwd".to_string()]).unwrap();
        assert_eq!(lines.iter().filter(|l| l.starts_with("root:")).count(), 1);

        let err = runner
            .capture_output("definitely-not-a-real-binary", &[])
            .unwrap_err();
        assert!(matches!(err, GoToolError::NotFound { .. }));
    }

    #[test]
    fn test_system_runner_timeout() {
        let runner = SystemRunner {
            timeout_secs: 1,
            ..Default::default()
        };
        let err = runner.capture_output("sleep", &["5".to_string()]).unwrap_err();
        assert!(matches!(err, GoToolError::TimedOut { secs: 1, .. }));
    }

    #[test]
    fn test_read_module_path() {
        let dir = tempfile::tempdir().unwrap();
        let go_mod = dir.path().join("go.mod");
        std::fs::write(
            &go_mod,
            "// comment\nmodule github.com/example/project // trailing\n\ngo 1.22\n",
        )
        .unwrap();
        assert_eq!(read_module_path(&go_mod).unwrap(), "github.com/example/project/");

        std::fs::write(&go_mod, "go 1.22\n").unwrap();
        assert!(read_module_path(&go_mod)
            .unwrap_err()
            .to_string()
            .contains("no module directive"));

        let err = read_module_path(Path::new("go-mod-does-not-exist")).unwrap_err();
        assert!(err.to_string().contains("failed reading go-mod-does-not-exist"));
    }
}
