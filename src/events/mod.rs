//! Runtime events and the broadcast bus they travel on.
//!
//! Every component publishes what it does — state changes, signals, command
//! results, captured fatal errors — to a shared [`Bus`]. The supervisor
//! forwards bus traffic to the configured subscriber sinks; nothing in the
//! crate writes to a global logger.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
