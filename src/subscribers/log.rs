//! # Simple stdout subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events in a compact human-readable form:
//!
//! ```text
//! [state] service=nginx state=starting
//! [command] service=nginx verb=start code=0
//! [state] service=nginx state=running
//! [signal] kind=stop
//! [fatal] err="failed to stop service while stopping"
//! ```
//!
//! Not intended for production use — implement a custom
//! [`Subscribe`](crate::Subscribe) for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::Subscribe;

/// Stdout logging subscriber (feature `logging`).
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::StateChanged => {
                println!(
                    "[state] service={} state={}",
                    e.service.as_deref().unwrap_or("?"),
                    e.reason.as_deref().unwrap_or("?"),
                );
            }
            EventKind::SignalReceived => {
                println!("[signal] kind={}", e.reason.as_deref().unwrap_or("?"));
            }
            EventKind::SignalIgnored => {
                println!("[signal-ignored] kind={}", e.reason.as_deref().unwrap_or("?"));
            }
            EventKind::CommandFinished => {
                println!(
                    "[command] service={} verb={} code={}",
                    e.service.as_deref().unwrap_or("?"),
                    e.reason.as_deref().unwrap_or("?"),
                    e.code.unwrap_or(-1),
                );
            }
            EventKind::FatalCaptured => {
                println!("[fatal] err={:?}", e.reason.as_deref().unwrap_or("?"));
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
