//! Tool Executor
//!
//! This module runs validated commands as subprocesses. It implements
//! timeout handling, bounded output capture, and typed failures.

use super::capture::{capture, CapturedStream};
use super::timeout::ExecutionTimeout;
use super::validator::SafeCommand;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

/// Default timeout for tool execution in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default per-stream output cap in bytes (1MB)
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Error types for command execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Command '{program}' failed with exit code {code}: {}", .stderr.trim())]
    NonZeroExit {
        program: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output of a command that exited successfully
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Standard output (truncated if too large)
    pub stdout: String,

    /// Standard error (truncated if too large)
    pub stderr: String,

    /// Exit code
    pub exit_code: i32,

    /// Execution duration in milliseconds
    pub duration_ms: f64,

    /// Whether stdout hit the output cap
    pub stdout_truncated: bool,

    /// Whether stderr hit the output cap
    pub stderr_truncated: bool,
}

impl CommandOutput {
    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Success (exit code: {}, {:.0}ms, {} bytes output)",
            self.exit_code,
            self.duration_ms,
            self.stdout.len() + self.stderr.len()
        );
        if self.stdout_truncated || self.stderr_truncated {
            summary.push_str(" [truncated]");
        }
        summary
    }
}

/// Configuration for tool execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Timeout policy (default: 30 seconds, 2 second kill grace)
    pub timeout: ExecutionTimeout,

    /// Maximum bytes kept per output stream (default: 1MB)
    pub max_output_size: usize,

    /// Working directory for command execution (default: current directory)
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: ExecutionTimeout::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_size: MAX_OUTPUT_SIZE,
            working_dir: None,
        }
    }
}

impl ExecutorConfig {
    /// Create a new executor config with custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: ExecutionTimeout::new(timeout),
            ..Default::default()
        }
    }

    /// Create a new executor config with custom output limit
    pub fn with_max_output_size(size: usize) -> Self {
        Self {
            max_output_size: size,
            ..Default::default()
        }
    }

    /// Create a new executor config with custom working directory
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Default::default()
        }
    }
}

/// Tool executor for supervised subprocess execution
///
/// # Security
///
/// This executor:
/// 1. Uses `tokio::process::Command` with an argument vector, never a shell
/// 2. Only accepts a [`SafeCommand`] produced by the validator
/// 3. Enforces the timeout, terminating the child when it passes
/// 4. Caps each output stream to prevent memory exhaustion
///
/// Each call owns its child, its pipe readers and its timer, so calls may run
/// concurrently without coordination.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create a new tool executor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new tool executor with custom configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Execute a validated command
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Spawn`] if the process cannot be started
    /// - [`ExecutionError::Timeout`] if it outlives the timeout (it is terminated)
    /// - [`ExecutionError::NonZeroExit`] if it exits unsuccessfully
    /// - [`ExecutionError::Io`] if reading its output or waiting on it fails
    pub async fn execute(&self, command: &SafeCommand) -> Result<CommandOutput, ExecutionError> {
        let (program, args) = command.as_tuple();
        let start = Instant::now();

        info!("Executing: {} ({} args)", program, args.len());
        debug!("Arguments: {:?}", args);

        let mut process = Command::new(program);
        process
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.config.working_dir {
            process.current_dir(dir);
        }

        let mut child = process.spawn().map_err(|source| {
            warn!("Failed to spawn {}: {}", program, source);
            ExecutionError::Spawn {
                program: program.to_string(),
                source,
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let timeout = &self.config.timeout;

        // Deadline first: if both are ready on the same poll the timeout wins
        let cap = self.config.max_output_size;
        let completed = tokio::select! {
            biased;
            _ = tokio::time::sleep(timeout.duration()) => None,
            result = wait_and_capture(&mut child, stdout, stderr, cap) => Some(result),
        };

        let Some(result) = completed else {
            warn!("Command timed out after {:?}: {}", timeout.duration(), program);
            timeout.terminate(&mut child).await;
            return Err(ExecutionError::Timeout {
                program: program.to_string(),
                timeout: timeout.duration(),
            });
        };

        let (status, stdout, stderr) = result.map_err(|source| ExecutionError::Io {
            program: program.to_string(),
            source,
        })?;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let exit_code = status.code().unwrap_or(-1);

        if !status.success() {
            warn!("Command failed: {} (exit code: {})", program, exit_code);
            return Err(ExecutionError::NonZeroExit {
                program: program.to_string(),
                code: exit_code,
                stdout: stdout.text,
                stderr: stderr.text,
            });
        }

        info!("Command succeeded: {} ({:.0}ms)", program, duration_ms);
        Ok(CommandOutput {
            stdout: stdout.text,
            stderr: stderr.text,
            exit_code,
            duration_ms,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
        })
    }

    /// Get a reference to the config
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get a mutable reference to the config
    pub fn config_mut(&mut self) -> &mut ExecutorConfig {
        &mut self.config
    }
}

/// Drain both pipes and reap the child
async fn wait_and_capture(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    cap: usize,
) -> std::io::Result<(ExitStatus, CapturedStream, CapturedStream)> {
    let (stdout, stderr, status) =
        tokio::join!(capture(stdout, cap), capture(stderr, cap), child.wait());
    Ok((status?, stdout?, stderr?))
}
