//! Step executor - runs one command inside the provisioned environment

use crate::environment::Environment;
use crate::error::JobError;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command's exit status (0 here; nonzero statuses surface as errors)
    pub exit_code: i32,

    /// Combined stdout/stderr. May be empty; that is not an error.
    pub output: String,
}

/// Executes a single command step.
pub struct StepExecutor;

impl StepExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` through `sh -c` in the environment's workspace.
    ///
    /// Exit status 0 maps to `Ok`; a nonzero status, a blown time budget,
    /// and cancellation each map to their own error. Timeout and command
    /// failures carry whatever output was captured before the end.
    pub async fn run(
        &self,
        name: &str,
        command: &str,
        timeout_secs: u64,
        env: &Environment,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, JobError> {
        info!("Executing step: {}", name);
        debug!("Command for step {}: {}", name, command);

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&env.workspace)
            .envs(&env.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobError::Command {
                name: name.to_string(),
                exit_code: 127,
                output: format!("failed to spawn shell: {}", e),
            })?;

        // Drain both pipes as the child runs so a timeout or cancellation
        // still has the partial output, and a chatty child never blocks on
        // a full pipe.
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, buffer.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, buffer.clone())));
        }

        let waited = timeout(Duration::from_secs(timeout_secs), async {
            tokio::select! {
                status = child.wait() => WaitOutcome::Exited(status),
                _ = cancel.cancelled() => WaitOutcome::Cancelled,
            }
        })
        .await;

        let status = match waited {
            Ok(WaitOutcome::Exited(status)) => status.map_err(|e| JobError::Command {
                name: name.to_string(),
                exit_code: 127,
                output: format!("failed to wait for child: {}", e),
            })?,
            Ok(WaitOutcome::Cancelled) => {
                info!("Step {} cancelled, killing process", name);
                let _ = child.kill().await;
                abandon(readers);
                return Err(JobError::Cancelled {
                    step: name.to_string(),
                });
            }
            Err(_) => {
                error!("Timeout for step {} after {}s", name, timeout_secs);
                let _ = child.kill().await;
                // orphaned grandchildren may hold the pipes open, so take
                // the partial output without waiting for EOF
                abandon(readers);
                let output = buffer.lock().await.clone();
                return Err(JobError::Timeout {
                    name: name.to_string(),
                    timeout_secs,
                    output,
                });
            }
        };

        let output = collect(buffer, readers).await;
        let exit_code = status.code().unwrap_or(-1);

        if status.success() {
            debug!("Step {} exited cleanly", name);
            Ok(CommandOutput { exit_code, output })
        } else {
            Err(JobError::Command {
                name: name.to_string(),
                exit_code,
                output,
            })
        }
    }
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self::new()
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, buffer: Arc<Mutex<String>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buffer
                    .lock()
                    .await
                    .push_str(&String::from_utf8_lossy(&chunk[..n]));
            }
        }
    }
}

async fn collect(buffer: Arc<Mutex<String>>, readers: Vec<JoinHandle<()>>) -> String {
    for reader in readers {
        let _ = reader.await;
    }
    buffer.lock().await.clone()
}

fn abandon(readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        reader.abort();
    }
}
