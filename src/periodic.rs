//! # PeriodicCaller: drift-free periodic scheduling.
//!
//! Invokes a tick callback on an exact cadence regardless of how long the
//! callback takes. Each firing passes the *scheduled* instant to the tick and
//! derives the next firing as `scheduled + period` — never `now + period` —
//! so timing error cannot accumulate.
//!
//! ## Execution modes
//! - [`ExecMode::Foreground`] — the next timer is armed only after the tick
//!   completes; ticks never overlap.
//! - [`ExecMode::Background`] — the next timer is armed immediately and the
//!   tick runs as a detached task; ticks may overlap.
//!
//! In both modes the tick's result is routed to the optional success/error
//! hooks. A routed error counts as handled: the schedule itself never stops
//! because a tick failed, and with no hook configured the error is dropped
//! after being observed.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use sigvisor::PeriodicCaller;
//!
//! # async fn demo() {
//! let mut pc = PeriodicCaller::new(Duration::from_secs(5), |_at| async {
//!     // poll something...
//!     Ok::<_, std::io::Error>(())
//! });
//! pc.start(None); // anchor defaults to now + period
//! // ...
//! pc.stop();
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Boxed tick future, one per firing.
type TickFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;
/// Shared tick factory: produces a fresh future for each scheduled instant.
type TickFn<T, E> = Arc<dyn Fn(Instant) -> TickFuture<T, E> + Send + Sync>;
/// Hook receiving a successful tick's value.
type SuccessHook<T> = Arc<dyn Fn(T) + Send + Sync>;
/// Hook receiving a failed tick's error.
type ErrorHook<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Whether the scheduler waits for a tick before arming the next timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Await the tick in place; scheduling is serialized with execution.
    #[default]
    Foreground,
    /// Detach the tick and arm the next timer immediately; overlap allowed.
    Background,
}

/// Drift-free periodic scheduler.
///
/// Created stopped; [`start`](PeriodicCaller::start) arms it,
/// [`stop`](PeriodicCaller::stop) (or drop) cancels the pending timer. Both
/// are idempotent, and at most one timer is pending per instance.
pub struct PeriodicCaller<T = (), E = ()> {
    tick: TickFn<T, E>,
    period: Duration,
    mode: ExecMode,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<E>>,
    armed: Option<CancellationToken>,
}

impl<T, E> PeriodicCaller<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a stopped caller that will invoke `tick` every `period`.
    ///
    /// The tick receives the scheduled instant of its firing, which is an
    /// exact multiple of `period` past the anchor — deterministic input even
    /// when firings run late.
    ///
    /// # Panics
    /// Panics if `period` is zero; a non-positive cadence is a programming
    /// error, not a runtime condition.
    pub fn new<F, Fut>(period: Duration, tick: F) -> Self
    where
        F: Fn(Instant) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        assert!(period > Duration::ZERO, "period must be positive");
        Self {
            tick: Arc::new(move |at| Box::pin(tick(at)) as TickFuture<T, E>),
            period,
            mode: ExecMode::default(),
            on_success: None,
            on_error: None,
            armed: None,
        }
    }

    /// Sets the execution mode (default: [`ExecMode::Foreground`]).
    #[must_use]
    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Routes each successful tick's value to `hook`.
    #[must_use]
    pub fn on_success(mut self, hook: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Routes each failed tick's error to `hook`.
    ///
    /// An error delivered here is considered handled; the schedule continues.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(E) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// True while a timer is armed.
    pub fn is_running(&self) -> bool {
        self.armed.is_some()
    }

    /// Arms the timer; a silent no-op while already running.
    ///
    /// The first firing happens at `at`, or at `now + period` when `at` is
    /// `None`. Every subsequent firing is scheduled at the previous
    /// *scheduled* instant plus the period.
    pub fn start(&mut self, at: Option<Instant>) {
        if self.armed.is_some() {
            return;
        }
        let anchor = at.unwrap_or_else(|| Instant::now() + self.period);
        let token = CancellationToken::new();
        tokio::spawn(fire_loop(
            Arc::clone(&self.tick),
            self.period,
            self.mode,
            self.on_success.clone(),
            self.on_error.clone(),
            token.clone(),
            anchor,
        ));
        self.armed = Some(token);
    }

    /// Cancels the pending timer; idempotent, safe in any state.
    ///
    /// A foreground tick already in flight runs to completion; no further
    /// firing is armed after it.
    pub fn stop(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
        }
    }
}

impl<T, E> Drop for PeriodicCaller<T, E> {
    fn drop(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
        }
    }
}

/// The timer loop: sleep until the scheduled instant, fire, repeat.
async fn fire_loop<T, E>(
    tick: TickFn<T, E>,
    period: Duration,
    mode: ExecMode,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<E>>,
    token: CancellationToken,
    anchor: Instant,
) where
    T: Send + 'static,
    E: Send + 'static,
{
    let mut next = anchor;
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = time::sleep_until(next) => {}
        }
        let scheduled = next;
        next += period;

        match mode {
            ExecMode::Foreground => {
                route((*tick)(scheduled).await, &on_success, &on_error);
            }
            ExecMode::Background => {
                let tick = Arc::clone(&tick);
                let on_success = on_success.clone();
                let on_error = on_error.clone();
                tokio::spawn(async move {
                    route((*tick)(scheduled).await, &on_success, &on_error);
                });
            }
        }
    }
}

fn route<T, E>(
    result: Result<T, E>,
    on_success: &Option<SuccessHook<T>>,
    on_error: &Option<ErrorHook<E>>,
) {
    match result {
        Ok(value) => {
            if let Some(hook) = on_success {
                hook(value);
            }
        }
        Err(error) => {
            if let Some(hook) = on_error {
                hook(error);
            }
        }
    }
}
