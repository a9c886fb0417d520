//! # Supervisor configuration.
//!
//! [`Config`] holds the knobs the core consumes: the health-check cadence and
//! the event bus capacity. The supervised service name is not configuration —
//! it identifies the instance and is passed to [`Supervisor::new`](crate::Supervisor::new).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use sigvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.health_interval = Duration::from_secs(10);
//!
//! assert_eq!(cfg.health_interval, Duration::from_secs(10));
//! ```

use std::time::Duration;

/// Runtime configuration for a [`Supervisor`](crate::Supervisor).
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between `status` health checks.
    pub health_interval: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides the default configuration:
    /// - `health_interval = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            health_interval: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
