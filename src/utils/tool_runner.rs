use crate::config::ThrottleProfile;
use crate::utils::{Error, JobLog, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error};

/// Lines of tool stderr carried in the error message
const STDERR_TAIL_LINES: usize = 12;

/// Runs one external binary under the job's throttle prefix.
#[derive(Clone)]
pub struct ToolRunner {
    tool_path: String,
    throttle: ThrottleProfile,
    log: Option<JobLog>,
}

impl ToolRunner {
    pub fn new(tool_path: String, throttle: ThrottleProfile) -> Self {
        Self {
            tool_path,
            throttle,
            log: None,
        }
    }

    pub fn with_log(mut self, log: Option<JobLog>) -> Self {
        self.log = log;
        self
    }

    /// Short name used in messages, e.g. `MP4Box` for `/opt/gpac/bin/MP4Box`
    pub fn display_name(&self) -> String {
        Path::new(&self.tool_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.tool_path.clone())
    }

    /// Resolves the tool on `PATH` (or as a direct path).
    pub fn check_availability(&self) -> Result<PathBuf> {
        debug!("Checking tool availability at: {}", self.tool_path);
        which::which(&self.tool_path).map_err(|e| {
            Error::dependency_missing(self.display_name(), format!("{}: {}", self.tool_path, e))
        })
    }

    /// First non-empty line the tool prints for `version_arg`.
    pub async fn version(&self, version_arg: &str) -> Option<String> {
        let output = Command::new(&self.tool_path)
            .arg(version_arg)
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }

    /// Builds the throttled command; children die with their handle.
    pub fn command(&self, args: &[String]) -> Command {
        let (program, wrapped) = self.throttle.wrap(&self.tool_path, args);

        debug!("Running: {} {}", program, wrapped.join(" "));
        if let Some(log) = &self.log {
            if let Err(e) = log.log_command(&program, &wrapped) {
                debug!("Failed to write job log: {}", e);
            }
        }

        let mut command = Command::new(program);
        command.args(&wrapped).kill_on_drop(true);
        command
    }

    /// Runs to completion, returning stdout. A non-zero exit becomes
    /// [`Error::Tool`] carrying the tail of stderr; `output_file`, when given,
    /// must exist and be non-empty afterwards.
    pub async fn run(&self, args: &[String], output_file: Option<&Path>) -> Result<String> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::tool(format!("Failed to run {}: {}", self.display_name(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(&output.status.to_string(), &stderr));
        }

        if let Some(file) = output_file {
            let size = tokio::fs::metadata(file).await.map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                return Err(Error::tool(format!(
                    "{} completed but produced no output at {}",
                    self.display_name(),
                    file.display()
                )));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("{} output: {}", self.display_name(), stdout.trim());
        Ok(stdout)
    }

    /// Spawns with caller-provided stdio for streaming pipelines.
    pub fn spawn(&self, args: &[String], stdin: Stdio, stdout: Stdio) -> Result<Child> {
        self.command(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::tool(format!("Failed to spawn {}: {}", self.display_name(), e)))
    }

    /// Waits for a spawned child and turns a non-zero exit into [`Error::Tool`].
    pub async fn wait(&self, child: Child) -> Result<()> {
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::tool(format!("{} failed: {}", self.display_name(), e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(self.failure(&output.status.to_string(), &stderr))
        }
    }

    fn failure(&self, status: &str, stderr: &str) -> Error {
        let name = self.display_name();
        error!("{} failed with {}", name, status);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            error!("  {}", line);
        }
        if let Some(log) = &self.log {
            if let Err(e) = log.log_tool_failure(&name, status, stderr) {
                debug!("Failed to write job log: {}", e);
            }
        }

        let tail = tail_lines(stderr, STDERR_TAIL_LINES);
        if tail.is_empty() {
            Error::tool(format!("{} exited with {}", name, status))
        } else {
            Error::tool(format!("{} exited with {}: {}", name, status, tail))
        }
    }
}

/// Last `n` non-empty lines of `text`, joined with `; `
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines[lines.len().saturating_sub(n)..].join("; ")
}
