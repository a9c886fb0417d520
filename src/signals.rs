//! # ScopedSignal: RAII registration of one OS signal handler.
//!
//! [`ScopedSignal::new`] subscribes a handler closure to one unix signal;
//! dropping the guard unsubscribes it on every exit path, normal or error.
//! Several guards nest to cover several signals within one scope — the
//! supervisor holds one for SIGTERM and one for SIGHUP for exactly the
//! duration of [`run`](crate::Supervisor::run).
//!
//! The handler runs on the runtime, not in signal context, so it is free to
//! spawn tasks or publish events. Coalescing follows unix semantics: signals
//! delivered while the listener is busy may collapse into one invocation.
//!
//! ## Example
//! ```no_run
//! use tokio::signal::unix::SignalKind;
//! use sigvisor::ScopedSignal;
//!
//! # fn demo() -> std::io::Result<()> {
//! let _hup = ScopedSignal::new(SignalKind::hangup(), || {
//!     println!("got SIGHUP");
//! })?;
//! // handler active until `_hup` drops
//! # Ok(())
//! # }
//! ```

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Guard keeping one signal handler registered for its own lifetime.
pub struct ScopedSignal {
    token: CancellationToken,
}

impl ScopedSignal {
    /// Registers `handler` for `kind`, effective immediately.
    ///
    /// Returns `Err` only when the OS-level registration itself fails; the
    /// caller treats that as an operational error.
    pub fn new(kind: SignalKind, handler: impl Fn() + Send + Sync + 'static) -> std::io::Result<Self> {
        let mut stream = signal(kind)?;
        let token = CancellationToken::new();
        let watch = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = watch.cancelled() => break,
                    received = stream.recv() => {
                        if received.is_none() {
                            break;
                        }
                        handler();
                    }
                }
            }
            // `stream` drops here, releasing the registration.
        });

        Ok(Self { token })
    }
}

impl Drop for ScopedSignal {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
