//! # Supervisor: the signal-driven service state machine.
//!
//! Owns the supervised state, reacts to stop/restart requests and periodic
//! health checks, and drives every lifecycle command through one serialized
//! [`CommandRunner`].
//!
//! ## State machine
//! ```text
//!                 run(): "start" ok
//!   STOPPED ─────────────────────────────► RUNNING ◄──────────────┐
//!      ▲  ▲                                 │  │                  │
//!      │  │ "start" failed (fatal)          │  │ restart signal   │ restart:
//!      │  └─────────────◄───────────────────┘  │                  │ "stop" ok,
//!      │                                       ▼                  │ "start" ok
//!      │ stop: "stop" ok (finish)           STOPPING ─────────────┘
//!      └──────────────◄────────────────────────┤
//!                                              │ "stop" failed (fatal)
//!                                              ▼
//!                                           UNKNOWN   (quarantine: true
//!                                                      external state lost)
//!
//!   RUNNING ── health check non-zero ──► fatal "service stopped unexpectedly"
//!                                        (no stop attempt, finish)
//! ```
//!
//! ## Run loop
//! [`Supervisor::run`] asserts `STOPPED`, installs the SIGTERM/SIGHUP hooks
//! and the health-check [`PeriodicCaller`] scoped to the call, runs `start`,
//! then suspends on the finished-signal. Whichever transition fails captures
//! the fatal error and sets the finished-signal; the run loop observes the
//! captured error after waking — no error ever crosses the suspension
//! boundary — and re-raises it to the caller. Teardown is by scope exit on
//! every path.
//!
//! ## Concurrency
//! One logical flow of control, but transitions still overlap in time (a
//! restart racing a health check, a second signal racing a transition in
//! flight). Those overlaps are resolved by explicit state checks — an atomic
//! `RUNNING → STOPPING` swap at the top of each handler — not by the command
//! lock, which only serializes the subprocesses themselves. A request that
//! loses the swap is an accepted no-op, published as `SignalIgnored`.

use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::command::{CommandRunner, ServiceCommandRunner};
use crate::config::Config;
use crate::error::FatalError;
use crate::events::{Bus, Event, EventKind};
use crate::periodic::PeriodicCaller;
#[cfg(unix)]
use crate::signals::ScopedSignal;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Supervised service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// Not running; the only state `run()` may be entered from.
    Stopped = 0,
    /// A `start` command is in flight.
    Starting = 1,
    /// Started successfully; health checks and signals are actionable.
    Running = 2,
    /// A stop or restart transition is in flight; further signals are no-ops.
    Stopping = 3,
    /// A stop attempt failed: the true external state is unknown and no
    /// further transition is attempted until the fatal error surfaces.
    Unknown = 4,
}

impl State {
    /// Returns a short stable label (snake_case) for events and logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Stopped => "stopped",
            State::Starting => "starting",
            State::Running => "running",
            State::Stopping => "stopping",
            State::Unknown => "unknown",
        }
    }

    fn from_u8(raw: u8) -> State {
        match raw {
            0 => State::Stopped,
            1 => State::Starting,
            2 => State::Running,
            3 => State::Stopping,
            _ => State::Unknown,
        }
    }
}

/// Shared core: everything the signal hooks and the health tick touch.
struct Core {
    service: Arc<str>,
    runner: Arc<dyn CommandRunner>,
    bus: Bus,
    state: AtomicU8,
    /// First captured fatal error of the current run.
    fatal: Mutex<Option<FatalError>>,
    /// Finished-signal: one-shot wake condition, replaced at each run start.
    finished: Mutex<CancellationToken>,
}

impl Core {
    fn state(&self) -> State {
        State::from_u8(self.state.load(AtomicOrdering::SeqCst))
    }

    fn set_state(&self, next: State) {
        self.state.store(next as u8, AtomicOrdering::SeqCst);
        self.publish_state(next);
    }

    fn publish_state(&self, state: State) {
        self.bus.publish(
            Event::new(EventKind::StateChanged)
                .with_service(Arc::clone(&self.service))
                .with_reason(state.as_label()),
        );
    }

    /// Atomically claims `RUNNING → STOPPING`.
    ///
    /// Returns `false` for a request that raced a transition already in
    /// flight (or arrived outside `RUNNING` altogether); such a request is an
    /// accepted no-op, published as `SignalIgnored`.
    fn begin_transition(&self, trigger: &'static str) -> bool {
        let claimed = self
            .state
            .compare_exchange(
                State::Running as u8,
                State::Stopping as u8,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            )
            .is_ok();
        if claimed {
            self.publish_state(State::Stopping);
        } else {
            self.bus
                .publish(Event::new(EventKind::SignalIgnored).with_reason(trigger));
        }
        claimed
    }

    /// Sets the finished-signal, waking `run()`.
    fn finish(&self) {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Records a fatal error (first capture wins) and sets the finished-signal.
    fn capture_fatal(&self, error: FatalError) {
        self.bus
            .publish(Event::new(EventKind::FatalCaptured).with_reason(error.to_string()));
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(error);
        self.finish();
    }

    fn take_fatal(&self) -> Option<FatalError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Installs a fresh finished-signal and clears the captured error.
    fn reset_for_run(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        *self
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = fresh.clone();
        *self.fatal.lock().unwrap_or_else(PoisonError::into_inner) = None;
        fresh
    }

    async fn command(&self, verb: &str) -> std::io::Result<i32> {
        self.runner.run(&[verb]).await
    }

    fn spawn_stop(self: &Arc<Self>) {
        self.bus
            .publish(Event::new(EventKind::SignalReceived).with_reason("stop"));
        let core = Arc::clone(self);
        tokio::spawn(async move { core.stop_service().await });
    }

    fn spawn_restart(self: &Arc<Self>) {
        self.bus
            .publish(Event::new(EventKind::SignalReceived).with_reason("restart"));
        let core = Arc::clone(self);
        tokio::spawn(async move { core.restart_service().await });
    }

    async fn stop_service(&self) {
        if !self.begin_transition("stop") {
            return;
        }
        match self.command("stop").await {
            Ok(0) => {
                self.set_state(State::Stopped);
                self.finish();
            }
            Ok(_) => {
                self.set_state(State::Unknown);
                self.capture_fatal(FatalError::StopFailed);
            }
            Err(error) => {
                self.set_state(State::Unknown);
                self.capture_fatal(error.into());
            }
        }
    }

    async fn restart_service(&self) {
        if !self.begin_transition("restart") {
            return;
        }
        match self.command("stop").await {
            Ok(0) => {}
            Ok(_) => {
                self.set_state(State::Unknown);
                self.capture_fatal(FatalError::RestartStopFailed);
                return;
            }
            Err(error) => {
                self.set_state(State::Unknown);
                self.capture_fatal(error.into());
                return;
            }
        }
        self.set_state(State::Starting);
        match self.command("start").await {
            Ok(0) => self.set_state(State::Running),
            Ok(_) => {
                self.set_state(State::Stopped);
                self.capture_fatal(FatalError::RestartStartFailed);
            }
            Err(error) => {
                self.set_state(State::Stopped);
                self.capture_fatal(error.into());
            }
        }
    }

    /// One health check: run `status`; non-zero while still `RUNNING` is
    /// fatal, with no stop attempt (the service is presumed already down).
    async fn check_health(&self) -> Result<(), FatalError> {
        let code = self.runner.run(&["status"]).await?;
        if code != 0 && self.state() == State::Running {
            return Err(FatalError::StatusLost);
        }
        Ok(())
    }
}

/// Signal hooks scoped to one `run()` call.
///
/// On non-unix targets nothing is installed; supervision is then driven only
/// through [`Supervisor::request_stop`] / [`Supervisor::request_restart`].
struct SignalScopes {
    #[cfg(unix)]
    _guards: Vec<ScopedSignal>,
}

impl SignalScopes {
    #[cfg(unix)]
    fn install(core: &Arc<Core>) -> std::io::Result<Self> {
        use tokio::signal::unix::SignalKind;

        let stop = ScopedSignal::new(SignalKind::terminate(), {
            let core = Arc::clone(core);
            move || core.spawn_stop()
        })?;
        let restart = ScopedSignal::new(SignalKind::hangup(), {
            let core = Arc::clone(core);
            move || core.spawn_restart()
        })?;
        Ok(Self {
            _guards: vec![stop, restart],
        })
    }

    #[cfg(not(unix))]
    fn install(_core: &Arc<Core>) -> std::io::Result<Self> {
        Ok(Self {})
    }
}

/// Supervises one OS-level service: signals in, lifecycle commands out.
///
/// See the [module docs](self) for the state machine and run-loop contract.
pub struct Supervisor {
    cfg: Config,
    subs: Arc<SubscriberSet>,
    core: Arc<Core>,
}

impl Supervisor {
    /// Creates a supervisor for `service` using the real system service tool.
    ///
    /// Must be called inside a tokio runtime when `subscribers` is non-empty
    /// (the fan-out listener is spawned here, once per supervisor).
    pub fn new(
        cfg: Config,
        service: impl Into<Arc<str>>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let service: Arc<str> = service.into();
        let bus = Bus::new(cfg.bus_capacity);
        let runner: Arc<dyn CommandRunner> = Arc::new(ServiceCommandRunner::new(
            Arc::clone(&service),
            bus.clone(),
        ));
        Self::assemble(cfg, service, subscribers, runner, bus)
    }

    /// Creates a supervisor driving lifecycle commands through a custom
    /// [`CommandRunner`] (alternate service tools, test doubles).
    pub fn with_runner(
        cfg: Config,
        service: impl Into<Arc<str>>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self::assemble(cfg, service.into(), subscribers, runner, bus)
    }

    fn assemble(
        cfg: Config,
        service: Arc<str>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        runner: Arc<dyn CommandRunner>,
        bus: Bus,
    ) -> Self {
        let sup = Self {
            cfg,
            subs: Arc::new(SubscriberSet::new(subscribers)),
            core: Arc::new(Core {
                service,
                runner,
                bus,
                state: AtomicU8::new(State::Stopped as u8),
                fatal: Mutex::new(None),
                finished: Mutex::new(CancellationToken::new()),
            }),
        };
        if !sup.subs.is_empty() {
            sup.subscriber_listener();
        }
        sup
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.core.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                subs.emit(&ev);
            }
        });
    }

    /// The supervised service's name.
    pub fn service(&self) -> &str {
        &self.core.service
    }

    /// Current state of the state machine.
    pub fn state(&self) -> State {
        self.core.state()
    }

    /// The event bus; subscribe here for raw event access.
    pub fn bus(&self) -> &Bus {
        &self.core.bus
    }

    /// Requests a stop transition, exactly as a SIGTERM would.
    ///
    /// Asynchronous: returns once the transition task is spawned. Ignored
    /// (and published as such) when the state machine is not `RUNNING`.
    pub fn request_stop(&self) {
        self.core.spawn_stop();
    }

    /// Requests a restart transition, exactly as a SIGHUP would.
    pub fn request_restart(&self) {
        self.core.spawn_restart();
    }

    /// Runs the state machine until an intentional stop or a fatal error.
    ///
    /// For the duration of the call — and strictly bracketing the `start`
    /// command — the SIGTERM stop hook, the SIGHUP restart hook, and the
    /// periodic health check are installed; all three are torn down on every
    /// exit path before this returns.
    ///
    /// Returns `Ok(())` after a clean stop, with the state back at
    /// [`State::Stopped`]. Re-raises the captured [`FatalError`] otherwise.
    ///
    /// # Panics
    /// Panics if the state machine is not `STOPPED`: calling `run()` on an
    /// instance that is already running (or quarantined in `UNKNOWN`) is a
    /// programming error, and aborts before any side effect.
    pub async fn run(&self) -> Result<(), FatalError> {
        let state = self.core.state();
        assert!(
            state == State::Stopped,
            "run() requires state STOPPED, found {state:?}"
        );
        let finished = self.core.reset_for_run();

        let _signals = SignalScopes::install(&self.core)?;
        let mut health = PeriodicCaller::new(self.cfg.health_interval, {
            let core = Arc::clone(&self.core);
            move |_at| {
                let core = Arc::clone(&core);
                async move { core.check_health().await }
            }
        })
        .on_error({
            let core = Arc::clone(&self.core);
            move |error| core.capture_fatal(error)
        });
        health.start(None);

        self.core.set_state(State::Starting);
        match self.core.command("start").await {
            Ok(0) => {}
            Ok(_) => {
                self.core.set_state(State::Stopped);
                return Err(FatalError::StartFailed);
            }
            Err(error) => {
                self.core.set_state(State::Stopped);
                return Err(error.into());
            }
        }
        self.core.set_state(State::Running);

        finished.cancelled().await;

        health.stop();
        drop(_signals);
        match self.core.take_fatal() {
            Some(error) => Err(error),
            None => {
                debug_assert_eq!(self.core.state(), State::Stopped);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Scripted command runner: per-verb queues of exit codes (default 0),
    /// recorded invocations, optional per-call latency.
    struct FakeRunner {
        codes: Mutex<HashMap<String, VecDeque<i32>>>,
        calls: Mutex<Vec<String>>,
        latency: Duration,
    }

    /// Sentinel exit code making the fake fail the spawn itself.
    const SPAWN_FAIL: i32 = i32::MIN;

    impl FakeRunner {
        fn scripted(script: &[(&str, &[i32])]) -> Arc<Self> {
            Self::scripted_with_latency(script, Duration::ZERO)
        }

        fn scripted_with_latency(script: &[(&str, &[i32])], latency: Duration) -> Arc<Self> {
            let codes = script
                .iter()
                .map(|(verb, codes)| (verb.to_string(), codes.iter().copied().collect()))
                .collect();
            Arc::new(Self {
                codes: Mutex::new(codes),
                calls: Mutex::new(Vec::new()),
                latency,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Recorded calls with the periodic `status` noise filtered out.
        fn lifecycle_calls(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|verb| verb != "status")
                .collect()
        }

        fn status_calls(&self) -> usize {
            self.calls().iter().filter(|verb| *verb == "status").count()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, args: &[&str]) -> std::io::Result<i32> {
            let verb = args.join(" ");
            self.calls.lock().unwrap().push(verb.clone());
            if self.latency > Duration::ZERO {
                tokio::time::sleep(self.latency).await;
            }
            let code = self
                .codes
                .lock()
                .unwrap()
                .get_mut(&verb)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(0);
            if code == SPAWN_FAIL {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "service tool missing",
                ));
            }
            Ok(code)
        }
    }

    fn supervisor(runner: Arc<FakeRunner>) -> Arc<Supervisor> {
        Arc::new(Supervisor::with_runner(
            Config::default(),
            "omg",
            Vec::new(),
            runner,
        ))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(30), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_stop_returns_normally() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[0])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        sup.request_stop();
        handle.await.unwrap().unwrap();

        assert_eq!(sup.state(), State::Stopped);
        assert_eq!(runner.lifecycle_calls(), ["start", "stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_is_fatal_and_reverts_to_stopped() {
        let runner = FakeRunner::scripted(&[("start", &[1])]);
        let sup = supervisor(Arc::clone(&runner));

        let err = sup.run().await.unwrap_err();
        assert_eq!(err.to_string(), "failed to start service");
        assert_eq!(sup.state(), State::Stopped);
        assert_eq!(runner.lifecycle_calls(), ["start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_spawn_failure_propagates() {
        let runner = FakeRunner::scripted(&[("start", &[SPAWN_FAIL])]);
        let sup = supervisor(runner);

        let err = sup.run().await.unwrap_err();
        assert!(matches!(err, FatalError::Spawn(_)));
        assert_eq!(sup.state(), State::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_failure_is_fatal_without_stop_attempt() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("status", &[1])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        // The next health tick sees status=1 while RUNNING and turns fatal.
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "service stopped unexpectedly");
        assert_eq!(runner.lifecycle_calls(), ["start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_spawn_failure_is_fatal_without_stop_attempt() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("status", &[SPAWN_FAIL])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        // The tool vanishing mid-run surfaces through the health tick's
        // error hook, not through the start path's early return.
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, FatalError::Spawn(_)));
        assert_eq!(runner.lifecycle_calls(), ["start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_service_keeps_run_blocked_across_many_intervals() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[0])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_finished());
        assert!(runner.status_calls() >= 10);

        sup.request_stop();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_returns_to_running_and_keeps_blocking() {
        let runner = FakeRunner::scripted(&[("start", &[0, 0]), ("stop", &[0, 0])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        sup.request_restart();
        wait_until(|| runner.lifecycle_calls() == ["start", "stop", "start"]).await;
        wait_until(|| sup.state() == State::Running).await;
        assert!(!handle.is_finished());

        sup.request_stop();
        handle.await.unwrap().unwrap();
        assert_eq!(sup.state(), State::Stopped);
        assert_eq!(runner.lifecycle_calls(), ["start", "stop", "start", "stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_stop_failure_quarantines_state() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[1])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        sup.request_restart();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "failed to stop service while restarting");
        assert_eq!(sup.state(), State::Unknown);
        assert_eq!(runner.lifecycle_calls(), ["start", "stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_start_failure_ends_stopped() {
        let runner = FakeRunner::scripted(&[("start", &[0, 1]), ("stop", &[0])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        sup.request_restart();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "failed to start service while restarting");
        assert_eq!(sup.state(), State::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_failure_quarantines_state() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[1])]);
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        sup.request_stop();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "failed to stop service while stopping");
        assert_eq!(sup.state(), State::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_outside_running_invoke_no_commands() {
        let runner = FakeRunner::scripted(&[]);
        let sup = supervisor(Arc::clone(&runner));

        sup.request_stop();
        sup.request_restart();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(runner.calls().is_empty());
        assert_eq!(sup.state(), State::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_restart_during_restart_is_ignored() {
        let runner = FakeRunner::scripted_with_latency(
            &[("start", &[0, 0]), ("stop", &[0, 0])],
            Duration::from_millis(50),
        );
        let sup = supervisor(Arc::clone(&runner));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        // Both requests are queued before either transition task runs; the
        // second one must lose the STOPPING claim and become a no-op.
        sup.request_restart();
        sup.request_restart();
        wait_until(|| runner.lifecycle_calls().len() == 3 && sup.state() == State::Running).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runner.lifecycle_calls(), ["start", "stop", "start"]);
        assert!(!handle.is_finished());

        sup.request_stop();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_can_be_called_again_after_clean_stop() {
        let runner = FakeRunner::scripted(&[("start", &[0, 0]), ("stop", &[0, 0])]);
        let sup = supervisor(Arc::clone(&runner));

        for _ in 0..2 {
            let handle = {
                let sup = Arc::clone(&sup);
                tokio::spawn(async move { sup.run().await })
            };
            wait_until(|| sup.state() == State::Running).await;
            sup.request_stop();
            handle.await.unwrap().unwrap();
            assert_eq!(sup.state(), State::Stopped);
        }
        assert_eq!(runner.lifecycle_calls(), ["start", "stop", "start", "stop"]);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "run() requires state STOPPED")]
    async fn test_run_while_not_stopped_is_a_programming_error() {
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[0])]);
        let sup = supervisor(runner);

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;

        let second = sup.run().await; // panics
        drop(second);
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_trace_the_clean_stop() {
        struct Trace(Mutex<Vec<(EventKind, Option<String>)>>);

        #[async_trait]
        impl Subscribe for Trace {
            async fn on_event(&self, event: &Event) {
                self.0
                    .lock()
                    .unwrap()
                    .push((event.kind, event.reason.as_deref().map(str::to_string)));
            }

            fn name(&self) -> &'static str {
                "trace"
            }
        }

        let trace = Arc::new(Trace(Mutex::new(Vec::new())));
        let runner = FakeRunner::scripted(&[("start", &[0]), ("stop", &[0])]);
        let sup = Arc::new(Supervisor::with_runner(
            Config::default(),
            "omg",
            vec![Arc::clone(&trace) as Arc<dyn Subscribe>],
            runner,
        ));

        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };
        wait_until(|| sup.state() == State::Running).await;
        sup.request_stop();
        handle.await.unwrap().unwrap();

        // Let the subscriber worker drain its queue.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let seen = trace.0.lock().unwrap().clone();
        let states: Vec<String> = seen
            .iter()
            .filter(|(kind, _)| *kind == EventKind::StateChanged)
            .filter_map(|(_, reason)| reason.clone())
            .collect();
        assert_eq!(states, ["starting", "running", "stopping", "stopped"]);
        assert!(seen
            .iter()
            .any(|(kind, reason)| *kind == EventKind::SignalReceived
                && reason.as_deref() == Some("stop")));
    }
}
