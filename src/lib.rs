//! # sigvisor
//!
//! **Sigvisor** supervises a single OS-level service by translating process
//! signals into lifecycle commands (`start` / `stop` / `restart`) run through
//! the system service tool, while polling the service's health on a fixed,
//! drift-free cadence.
//!
//! ## Architecture
//! ```text
//!   SIGTERM ──► ScopedSignal ──► request_stop ────┐
//!   SIGHUP  ──► ScopedSignal ──► request_restart ─┤
//!                                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Supervisor (state machine: STOPPED / STARTING / RUNNING /    │
//! │              STOPPING / UNKNOWN)                              │
//! │  - finished-signal (one-shot CancellationToken per run)       │
//! │  - captured fatal error (re-raised by run())                  │
//! └──────┬───────────────────────────────┬────────────────────────┘
//!        │ lifecycle commands            │ every health_interval
//!        ▼                               ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │ ServiceCommandRunner │◄─────│    PeriodicCaller    │
//! │ (FIFO lock, one      │status│ (drift-free timer,   │
//! │  subprocess at a     │      │  fg/bg tick modes)   │
//! │  time)               │      └──────────────────────┘
//! └──────┬───────────────┘
//!        ▼
//!   `service <name> <verb>`   (exit 0 = ok, anything else = failure)
//!
//! Observability:
//!   every component ── publish(Event) ──► Bus ──► SubscriberSet ──► sinks
//! ```
//!
//! ## Lifecycle
//! [`Supervisor::run`] installs the signal hooks and the health-check timer
//! for its own duration (torn down on every exit path), runs `start`, then
//! suspends until the finished-signal fires: a clean stop returns `Ok(())`
//! with the state back at `STOPPED`; a failed transition or a failed health
//! check re-raises the captured [`FatalError`] to the caller. There are no
//! internal retries; supervision is restarted by calling `run()` again.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use sigvisor::{Config, Subscribe, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!     let sup = Supervisor::new(Config::default(), "nginx", subs);
//!
//!     // Blocks until SIGTERM (clean stop) or a fatal failure.
//!     sup.run().await?;
//!     Ok(())
//! }
//! ```

mod command;
mod config;
mod error;
mod events;
mod periodic;
mod subscribers;
mod supervisor;

#[cfg(unix)]
mod signals;

// ---- Public re-exports ----

pub use command::{CommandRunner, ServiceCommandRunner};
pub use config::Config;
pub use error::FatalError;
pub use events::{Bus, Event, EventKind};
pub use periodic::{ExecMode, PeriodicCaller};
pub use subscribers::{Subscribe, SubscriberSet};
pub use supervisor::{State, Supervisor};

#[cfg(unix)]
pub use signals::ScopedSignal;

// Optional: a simple built-in stdout subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
