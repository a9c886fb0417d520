//! Fatal errors that terminate a supervision run.
//!
//! Every variant of [`FatalError`] ends the current [`run`](crate::Supervisor::run)
//! and is surfaced to its caller; nothing is retried internally. The message
//! of each transition variant names the phase that failed, so the caller can
//! tell a failed start apart from a failed stop mid-restart.

use thiserror::Error;

/// # Errors that abort a supervision run.
///
/// Lifecycle commands signal failure through their exit status, so most
/// variants carry no payload: the phase is the information. [`FatalError::Spawn`]
/// wraps the operational case where the service tool could not be launched at
/// all; the underlying [`std::io::Error`] is propagated unmodified as the source.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FatalError {
    /// The initial `start` command exited non-zero.
    #[error("failed to start service")]
    StartFailed,

    /// The `stop` command exited non-zero during a stop transition.
    ///
    /// The true external state is unknown afterwards; the supervisor is
    /// quarantined in [`State::Unknown`](crate::State::Unknown).
    #[error("failed to stop service while stopping")]
    StopFailed,

    /// The `stop` half of a restart exited non-zero.
    #[error("failed to stop service while restarting")]
    RestartStopFailed,

    /// The `start` half of a restart exited non-zero.
    #[error("failed to start service while restarting")]
    RestartStartFailed,

    /// A health check found the service down while it should be running.
    ///
    /// No stop command is attempted: the service is presumed already gone.
    #[error("service stopped unexpectedly")]
    StatusLost,

    /// The service tool itself could not be spawned.
    #[error("failed to run service command: {0}")]
    Spawn(#[from] std::io::Error),
}

impl FatalError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sigvisor::FatalError;
    ///
    /// assert_eq!(FatalError::StartFailed.as_label(), "start_failed");
    /// assert_eq!(FatalError::StatusLost.as_label(), "status_lost");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FatalError::StartFailed => "start_failed",
            FatalError::StopFailed => "stop_failed",
            FatalError::RestartStopFailed => "restart_stop_failed",
            FatalError::RestartStartFailed => "restart_start_failed",
            FatalError::StatusLost => "status_lost",
            FatalError::Spawn(_) => "spawn_failed",
        }
    }
}
