use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{program} could not be started: {reason}")]
    IO { program: String, reason: String },
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    /// stdout on success, stderr otherwise
    pub fn text(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Runs external programs from an argument vector.
/// Arguments are never passed through a shell.
#[allow(async_fn_in_trait)]
pub trait Runner {
    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Output, Error>;
}

#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Runner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Output, Error> {
        tracing::debug!(program, ?args, "running external command");
        let io_err = |err: std::io::Error| Error::IO {
            program: program.to_string(),
            reason: err.to_string(),
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(io_err)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await.map_err(io_err)?;
            // closing stdin lets filters like `wg pubkey` terminate
            drop(pipe);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                program: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(io_err)?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            tracing::warn!(stderr, program, "external command stderr");
        }

        Ok(Output {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr,
        })
    }
}
