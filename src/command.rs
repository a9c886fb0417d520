//! # Serialized lifecycle-command execution.
//!
//! [`CommandRunner`] is the seam the supervisor drives `start` / `stop` /
//! `status` through; [`ServiceCommandRunner`] is the real implementation that
//! shells out to the system service tool. A FIFO lock guarantees at most one
//! subprocess in flight per instance, so concurrent transitions and health
//! checks queue instead of racing the external tool.
//!
//! A non-zero exit status is a normal result for the caller to interpret —
//! only the inability to spawn the tool at all is an error. There is no
//! timeout on the subprocess: a hang in the external tool blocks the whole
//! state machine, which is an accepted (and visible) limitation rather than a
//! silently swallowed one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::events::{Bus, Event, EventKind};

/// Exit status reported when the subprocess was killed by a signal and has no
/// exit code of its own.
const KILLED_BY_SIGNAL: i32 = -1;

/// Executes one lifecycle command and reports its integer exit status.
///
/// Implementations must serialize invocations per instance: the supervisor
/// relies on only one command being in flight for its service at any time.
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs the command identified by `args` and returns its exit status.
    ///
    /// `Ok(code)` for any completed subprocess, zero or not; `Err` only when
    /// the process could not be spawned.
    async fn run(&self, args: &[&str]) -> std::io::Result<i32>;
}

/// Runs `service <name> <args…>` through the system service tool.
///
/// Cheap handle state: the name and program are read-only after construction,
/// and the lock is the only mutable part.
pub struct ServiceCommandRunner {
    name: Arc<str>,
    program: String,
    lock: Mutex<()>,
    bus: Bus,
}

impl ServiceCommandRunner {
    /// Creates a runner for the given service, invoking the `service`
    /// executable from `PATH`.
    pub fn new(name: impl Into<Arc<str>>, bus: Bus) -> Self {
        Self {
            name: name.into(),
            program: "service".to_string(),
            lock: Mutex::new(()),
            bus,
        }
    }

    /// Overrides the executable (absolute path, or a stand-in under test).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The supervised service's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CommandRunner for ServiceCommandRunner {
    async fn run(&self, args: &[&str]) -> std::io::Result<i32> {
        // tokio's Mutex is fair: queued callers run in arrival order.
        let _guard = self.lock.lock().await;

        let mut child = Command::new(&self.program)
            .arg(self.name.as_ref())
            .args(args)
            .spawn()?;
        let status = child.wait().await?;
        let code = status.code().unwrap_or(KILLED_BY_SIGNAL);

        self.bus.publish(
            Event::new(EventKind::CommandFinished)
                .with_service(Arc::clone(&self.name))
                .with_reason(args.join(" "))
                .with_code(code),
        );
        Ok(code)
    }
}
