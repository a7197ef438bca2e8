//! Fixed-interval polling of remote asynchronous operations
//!
//! [`wait_until_complete`] queries a status function until it reports a
//! terminal state, the deadline runs out, or the [`CancelSignal`] fires.
//! The result is a [`WaitOutcome`] rather than an error so callers can tell
//! a timeout from a remote failure from an operator interrupt.

use crate::cancel::CancelSignal;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What one status query observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Complete,
    Failed(String),
    InProgress,
}

/// How long a wait may keep polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Poll at most this many times
    Attempts(u32),
    /// Stop once this much time has passed since the first poll
    Elapsed(Duration),
    /// Poll until a terminal state or cancellation
    Unbounded,
}

/// Polling configuration
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between status queries
    pub interval: Duration,
    pub deadline: Deadline,
}

impl WaitConfig {
    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            deadline: Deadline::Attempts(max_attempts),
        }
    }

    pub fn elapsed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            deadline: Deadline::Elapsed(timeout),
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Deadline::Unbounded,
        }
    }

    fn timeout_message(&self, resource: &str, attempts: u32, elapsed: Duration) -> Option<String> {
        match self.deadline {
            Deadline::Attempts(max) if attempts >= max => Some(format!(
                "timed out waiting for {resource} after {attempts} attempts"
            )),
            Deadline::Elapsed(limit) if elapsed >= limit => Some(format!(
                "timed out waiting for {resource} after {limit:?}"
            )),
            _ => None,
        }
    }
}

/// Terminal state of a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Succeeded,
    /// The remote reported failure, or the status query itself failed
    Failed(String),
    /// The deadline ran out; the message names the awaited resource
    TimedOut(String),
    /// The cancellation signal fired; carries its cause
    Cancelled(String),
}

impl WaitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WaitOutcome::Succeeded)
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitOutcome::Succeeded => write!(f, "succeeded"),
            WaitOutcome::Failed(reason) => write!(f, "{reason}"),
            WaitOutcome::TimedOut(message) => write!(f, "{message}"),
            WaitOutcome::Cancelled(cause) => write!(f, "{cause}"),
        }
    }
}

/// Poll `poll` every `config.interval` until it reports a terminal state.
///
/// Cancellation is checked after every in-progress poll and raced against
/// each sleep. It is never checked inside `poll` itself. No sleep follows
/// the final attempt of an attempt-bounded wait.
///
/// # Example
/// ```ignore
/// let outcome = wait_until_complete(
///     "mount targets of fs-123",
///     &WaitConfig::attempts(Duration::from_secs(5), 120),
///     &cancel,
///     || async { Ok::<_, AwsError>(if efs.mount_targets_gone(id).await? { PollStatus::Complete } else { PollStatus::InProgress }) },
/// ).await;
/// ```
pub async fn wait_until_complete<F, Fut, E>(
    resource: &str,
    config: &WaitConfig,
    cancel: &CancelSignal,
    mut poll: F,
) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus, E>>,
    E: fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match poll().await {
            Ok(PollStatus::Complete) => {
                debug!(resource, attempts, "Wait complete");
                return WaitOutcome::Succeeded;
            }
            Ok(PollStatus::Failed(reason)) => {
                warn!(resource, attempts, %reason, "Remote operation failed");
                return WaitOutcome::Failed(reason);
            }
            Err(e) => {
                warn!(resource, attempts, error = %e, "Status query failed");
                return WaitOutcome::Failed(e.to_string());
            }
            Ok(PollStatus::InProgress) => {}
        }

        if cancel.is_cancelled() {
            debug!(resource, attempts, "Wait cancelled");
            return WaitOutcome::Cancelled(cancel.cause());
        }

        if let Some(message) = config.timeout_message(resource, attempts, start.elapsed()) {
            warn!(resource, attempts, "Wait timed out");
            return WaitOutcome::TimedOut(message);
        }

        debug!(
            resource,
            attempt = attempts,
            delay_ms = config.interval.as_millis() as u64,
            "Still in progress, polling again"
        );

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = cancel.cancelled() => {
                debug!(resource, attempts, "Wait cancelled while sleeping");
                return WaitOutcome::Cancelled(cancel.cause());
            }
        }
    }
}
