//! # Events emitted by the supervisor, the command runner, and the signal hooks.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (timestamp, service name, free-form reason, exit code). Each event gets a
//! globally unique, monotonically increasing sequence number so sinks can
//! restore exact order even when delivery interleaves.
//!
//! ## Example
//! ```rust
//! use sigvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CommandFinished)
//!     .with_service("nginx")
//!     .with_reason("start")
//!     .with_code(0);
//!
//! assert_eq!(ev.kind, EventKind::CommandFinished);
//! assert_eq!(ev.service.as_deref(), Some("nginx"));
//! assert_eq!(ev.code, Some(0));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The supervisor state machine moved to a new state.
    ///
    /// Sets:
    /// - `service`: supervised service name
    /// - `reason`: new state label (e.g. `"running"`)
    StateChanged,

    /// A stop or restart request was accepted for handling.
    ///
    /// Sets:
    /// - `reason`: `"stop"` or `"restart"`
    SignalReceived,

    /// A stop or restart request arrived while the state machine was not
    /// `RUNNING` and was ignored (accepted no-op, not an error).
    ///
    /// Sets:
    /// - `reason`: `"stop"` or `"restart"`
    SignalIgnored,

    /// A lifecycle command subprocess terminated.
    ///
    /// Sets:
    /// - `service`: supervised service name
    /// - `reason`: the command verb(s), space-joined
    /// - `code`: integer exit status
    CommandFinished,

    /// A fatal error was captured; the current run is finishing.
    ///
    /// Sets:
    /// - `reason`: the error message
    FatalCaptured,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Supervised service name, if applicable.
    pub service: Option<Arc<str>>,
    /// Human-readable detail (state label, verb, error message).
    pub reason: Option<Arc<str>>,
    /// Subprocess exit status, if applicable.
    pub code: Option<i32>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
            code: None,
        }
    }

    /// Attaches the supervised service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a subprocess exit status.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}
