//! Execution Timeout Management
//!
//! This module provides the timeout policy for subprocess execution and the
//! termination sequence used when a deadline passes.

use super::executor::DEFAULT_TIMEOUT_SECS;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

/// Default grace period between SIGTERM and SIGKILL
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Execution timeout configuration
///
/// Timeouts are enforced to prevent commands from hanging indefinitely. When
/// the deadline passes the child gets `kill_grace` to exit after SIGTERM
/// before it is sent SIGKILL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTimeout {
    /// The timeout duration
    duration: Duration,

    /// Time allowed between SIGTERM and SIGKILL
    kill_grace: Duration,
}

impl Default for ExecutionTimeout {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TIMEOUT_SECS)
    }
}

impl ExecutionTimeout {
    /// Create a new execution timeout
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use execguard::tools::ExecutionTimeout;
    ///
    /// let timeout = ExecutionTimeout::new(Duration::from_secs(30));
    /// assert_eq!(timeout.duration(), Duration::from_secs(30));
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Set the grace period between SIGTERM and SIGKILL
    ///
    /// A zero grace period sends SIGKILL straight away.
    pub fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    /// Get the timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Get the termination grace period
    pub fn kill_grace(&self) -> Duration {
        self.kill_grace
    }

    /// Create a timeout from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Terminate a child that outlived its deadline
    ///
    /// Sends SIGTERM, waits up to the grace period, then falls back to
    /// SIGKILL. On non-unix targets the child is killed directly. The child is
    /// reaped before returning.
    pub async fn terminate(&self, child: &mut Child) {
        if let Ok(Some(status)) = child.try_wait() {
            debug!("Child already exited before termination: {}", status);
            return;
        }

        if !self.kill_grace.is_zero() && send_sigterm(child) {
            match tokio::time::timeout(self.kill_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!("Child exited after SIGTERM: {}", status);
                    return;
                }
                Ok(Err(e)) => warn!("Failed waiting for child after SIGTERM: {}", e),
                Err(_) => debug!(
                    "Child ignored SIGTERM for {:?}, sending SIGKILL",
                    self.kill_grace
                ),
            }
        }

        if let Err(e) = child.kill().await {
            warn!("Failed to kill child process: {}", e);
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped
        return false;
    };

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to send SIGTERM to {}: {}", pid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}
