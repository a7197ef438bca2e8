//! External process execution
//!
//! `ecs publish-image` drives the `aws` and `docker` CLIs. The runner sits
//! behind [`CommandRunner`] so the pipeline can be tested without either.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// A command that could not be run or exited unsuccessfully.
///
/// Renders as `"<program> <args>: <message>"`, where the message is the
/// command's trimmed stderr when it wrote any.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command}: {message}")]
pub struct ProcessError {
    pub command: String,
    pub message: String,
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, feeding `stdin` if given, and return its
    /// trimmed stdout.
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> impl Future<Output = Result<String, ProcessError>> + Send;
}

/// Runs commands on the local system with `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Kill the command if it runs longer than this
    pub timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
        }
    }
}

pub fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<String, ProcessError> {
        let command = display_command(program, args);
        let fail = |message: String| ProcessError {
            command: command.clone(),
            message,
        };
        debug!(cmd = %program, args = ?args, "Running command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fail(e.to_string()))?;

        if let Some(input) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| fail(e.to_string()))?;
            // closing stdin lets the child see EOF
            drop(pipe);
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| fail(e.to_string()))?,
            Err(_) => {
                warn!(cmd = %program, timeout_secs = self.timeout.as_secs(), "Command timed out");
                return Err(fail(format!("timed out after {:?}", self.timeout)));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(fail(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
