//! # Test runner
//!
//! Launches the project's build+test command inside the sandbox root and
//! captures the full console output.
//!
//! ## Design
//! - stderr is merged into stdout at the shell level, one combined stream
//! - the stream is consumed line by line to EOF *before* waiting on the
//!   child, so a full OS pipe buffer can never deadlock the wait
//! - pass/fail is decided purely by the build tool's own success banner
//!   in the output, never by the exit code

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Default build+test command, matching the Maven workflow the agent drives
pub const DEFAULT_COMMAND: &str = "mvn clean test";

/// The marker Maven prints on a passing build
pub const SUCCESS_MARKER: &str = "BUILD SUCCESS";

/// Outcome of one build+test run
#[derive(Debug, Clone)]
pub struct TestRun {
    /// True iff the success marker appeared in the captured output
    pub passed: bool,
    /// Combined stdout+stderr, complete
    pub output: String,
}

/// Runs the build+test command in a fixed working directory.
///
/// Stateless beyond its configuration; safe to call repeatedly.
#[derive(Debug, Clone)]
pub struct TestRunner {
    workdir: PathBuf,
    command: String,
    success_marker: String,
}

impl TestRunner {
    /// Create a runner for the default Maven workflow
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            command: DEFAULT_COMMAND.to_string(),
            success_marker: SUCCESS_MARKER.to_string(),
        }
    }

    /// Override the build+test command
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Override the success marker searched for in the output
    pub fn with_success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_marker = marker.into();
        self
    }

    /// The marker this runner searches for
    pub fn success_marker(&self) -> &str {
        &self.success_marker
    }

    /// Run the command to completion and report pass/fail plus full output.
    ///
    /// Launch and wait failures are reported as a failed run with a
    /// diagnostic message, never as an error.
    pub async fn run(&self) -> TestRun {
        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(e) => {
                return TestRun {
                    passed: false,
                    output: format!("Failed to execute '{}': {}", self.command, e),
                }
            }
        };

        let mut output = String::new();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        output.push_str(&line);
                        output.push('\n');
                    }
                    Ok(None) => break,
                    Err(e) => {
                        output.push_str(&format!("(output stream error: {})\n", e));
                        break;
                    }
                }
            }
        }

        if let Err(e) = child.wait().await {
            return TestRun {
                passed: false,
                output: format!("Failed to wait on '{}': {}\n{}", self.command, e, output),
            };
        }

        let passed = output.contains(&self.success_marker);
        TestRun { passed, output }
    }

    fn spawn(&self) -> std::io::Result<tokio::process::Child> {
        // Shell-level redirection merges stderr into the one captured stream.
        let merged = format!("{} 2>&1", self.command);
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd.exe");
            cmd.arg("/C").arg(&merged);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&merged);
            cmd
        };
        cmd.current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
    }
}
