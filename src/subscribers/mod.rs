//! # Event subscribers: injected observability sinks.
//!
//! The supervisor never logs through a process-wide singleton. Instead, sinks
//! implementing [`Subscribe`] are handed to it at construction and fed every
//! [`Event`](crate::events::Event) that crosses the bus.
//!
//! ## Flow
//! ```text
//! components ── publish(Event) ──► Bus ──► supervisor listener ──► SubscriberSet
//!                                                              ┌──────┼──────┐
//!                                                              ▼      ▼      ▼
//!                                                        [queue 1][queue 2][queue N]
//!                                                              ▼      ▼      ▼
//!                                                        worker 1 worker 2 worker N
//!                                                              ▼      ▼      ▼
//!                                                          sub.on_event(&Event)
//! ```
//!
//! Each subscriber gets its own bounded queue and worker task, so a slow sink
//! never blocks the supervisor or its peers.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
