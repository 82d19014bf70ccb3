//! Child process execution with captured output, timeouts, and auditing.
//!
//! Arguments are always passed as a vector, never interpolated into a shell
//! string, so tool output and operator input cannot inject shell
//! metacharacters. Stdin is closed to rule out interactive prompts. Every
//! invocation, including failed ones, lands in the audit log.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::time;

use crate::audit::AuditLogger;
use crate::errors::{Result, SkatError};

/// Captured result of a completed child process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Resolve a tool name to an executable path without spawning anything.
///
/// Names containing a path separator are taken as-is; bare names are searched
/// on PATH. Returns `ToolNotFound` when no executable file matches.
pub fn resolve_tool(tool: &str) -> Result<PathBuf> {
    let as_path = Path::new(tool);
    let has_dir = as_path.parent().is_some_and(|p| !p.as_os_str().is_empty());

    if has_dir {
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }
        return Err(SkatError::ToolNotFound(tool.to_string()));
    }

    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            let candidate = dir.join(tool);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(SkatError::ToolNotFound(tool.to_string()))
}

pub struct CommandRunner {
    runtime: Runtime,
    timeout: Duration,
    audit: Arc<AuditLogger>,
}

impl CommandRunner {
    pub fn new(audit: Arc<AuditLogger>, timeout: Duration) -> Result<Self> {
        let runtime = Runtime::new()?;
        Ok(Self {
            runtime,
            timeout,
            audit,
        })
    }

    /// Run a tool to completion, capturing both output streams.
    ///
    /// Blocks the calling thread until the child exits or the configured
    /// timeout elapses. On timeout the child is terminated, a `Cancelled`
    /// outcome is audited, and `Timeout` is returned. A non-zero exit is
    /// returned as a normal `ToolOutput`; see [`run_checked`] for the
    /// stage-fatal variant.
    ///
    /// [`run_checked`]: CommandRunner::run_checked
    pub fn run(&self, tool: &str, args: &[String], cwd: Option<&Path>) -> Result<ToolOutput> {
        // Audit under the bare tool name even when invoked via a full path.
        let name = tool_name(tool);

        let resolved = match resolve_tool(tool) {
            Ok(path) => path,
            Err(err) => {
                self.audit.failure(&name, args, &err.to_string())?;
                return Err(err);
            }
        };

        debug!("Running {} {:?}", resolved.display(), args);

        let timeout = self.timeout;
        let result = self.runtime.block_on(async {
            let mut cmd = Command::new(&resolved);
            cmd.args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = cwd {
                cmd.current_dir(dir);
            }

            let child = cmd.spawn()?;

            // wait_with_output owns the child; if the timeout fires, the
            // dropped future kills the process via kill_on_drop.
            match time::timeout(timeout, child.wait_with_output()).await {
                Ok(finished) => finished.map(Some),
                Err(_elapsed) => Ok(None),
            }
        });

        match result {
            Ok(Some(output)) => {
                let status = output.status.code().unwrap_or(-1);
                let tool_output = ToolOutput {
                    status,
                    stdout: output.stdout,
                    stderr: output.stderr,
                };
                if tool_output.success() {
                    self.audit.success(&name, args)?;
                } else {
                    self.audit
                        .failure(&name, args, &format!("exit status {}", status))?;
                }
                Ok(tool_output)
            }
            Ok(None) => {
                let seconds = timeout.as_secs();
                self.audit
                    .cancelled(&name, args, &format!("terminated after {}s timeout", seconds))?;
                Err(SkatError::Timeout {
                    tool: name,
                    seconds,
                })
            }
            Err(err) => {
                self.audit.failure(&name, args, &err.to_string())?;
                Err(SkatError::Io(err))
            }
        }
    }

    /// Like [`run`](CommandRunner::run), but a non-zero exit becomes a
    /// `ToolExecutionFailure`. Analysis stages use this so a failing tool
    /// halts the run.
    pub fn run_checked(&self, tool: &str, args: &[String], cwd: Option<&Path>) -> Result<ToolOutput> {
        let output = self.run(tool, args, cwd)?;
        if !output.success() {
            return Err(SkatError::ToolExecutionFailure {
                tool: tool_name(tool),
                status: output.status,
                stderr: output.stderr_text(),
            });
        }
        Ok(output)
    }

    /// Launch a tool without waiting for it (used for hand-off to Autopsy).
    pub fn spawn_detached(&self, tool: &str, args: &[String]) -> Result<()> {
        let name = tool_name(tool);
        let resolved = match resolve_tool(tool) {
            Ok(path) => path,
            Err(err) => {
                self.audit.failure(&name, args, &err.to_string())?;
                return Err(err);
            }
        };

        std::process::Command::new(resolved)
            .args(args)
            .stdin(Stdio::null())
            .spawn()?;

        self.audit.success(&name, args)?;
        Ok(())
    }
}

/// Bare tool name for audit entries and error messages.
fn tool_name(tool: &str) -> String {
    Path::new(tool)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| tool.to_string())
}
