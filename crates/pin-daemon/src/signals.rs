//! Signal handling for daemon shutdown.
//!
//! SIGTERM and SIGINT set async-signal-safe atomic flags; a small poll
//! thread forwards them to the [`StopFlag`] shared with the sampling and
//! counting loops.

use pin_runtime::StopFlag;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Signal types that the daemon handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM - Graceful termination request.
    Terminate,
    /// SIGINT - Interrupt (Ctrl+C).
    Interrupt,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Terminate => write!(f, "SIGTERM"),
            SignalKind::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Shared state between the signal poll thread and the main loop.
#[derive(Debug, Default)]
pub struct SignalState {
    stop: StopFlag,
    signal_count: AtomicU32,
}

impl SignalState {
    /// Create a new signal state.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_signal(&self, kind: SignalKind) {
        self.signal_count.fetch_add(1, Ordering::Relaxed);
        info!(signal = %kind, "Shutdown signal received");
        self.stop.request_stop();
    }

    /// Get the total number of signals received.
    pub fn signal_count(&self) -> u32 {
        self.signal_count.load(Ordering::Relaxed)
    }
}

static SIGTERM_FLAG: AtomicBool = AtomicBool::new(false);
static SIGINT_FLAG: AtomicBool = AtomicBool::new(false);

/// Handle for signal management.
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    /// Create a new signal handler and register signal handlers.
    ///
    /// On Unix systems, this registers handlers for SIGTERM and SIGINT.
    /// On other platforms nothing sets the stop flag.
    pub fn new() -> std::io::Result<Self> {
        let handler = Self {
            state: Arc::new(SignalState::new()),
        };

        #[cfg(unix)]
        handler.register_unix_handlers()?;

        Ok(handler)
    }

    #[cfg(unix)]
    fn register_unix_handlers(&self) -> std::io::Result<()> {
        use std::os::raw::c_int;

        extern "C" fn sigterm_handler(_: c_int) {
            SIGTERM_FLAG.store(true, Ordering::Relaxed);
        }

        extern "C" fn sigint_handler(_: c_int) {
            SIGINT_FLAG.store(true, Ordering::Relaxed);
        }

        let state = Arc::clone(&self.state);
        std::thread::Builder::new()
            .name("pin-signals".into())
            .spawn(move || loop {
                if SIGTERM_FLAG.swap(false, Ordering::Relaxed) {
                    state.record_signal(SignalKind::Terminate);
                }
                if SIGINT_FLAG.swap(false, Ordering::Relaxed) {
                    state.record_signal(SignalKind::Interrupt);
                }
                if state.stop.is_stopped() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            })?;

        // SAFETY: the handlers only store to static atomics.
        let results = unsafe {
            [
                libc::signal(libc::SIGTERM, sigterm_handler as libc::sighandler_t),
                libc::signal(libc::SIGINT, sigint_handler as libc::sighandler_t),
            ]
        };
        if results.contains(&libc::SIG_ERR) {
            return Err(std::io::Error::last_os_error());
        }

        debug!("Unix signal handlers registered");
        Ok(())
    }

    /// Stop flag set when a shutdown signal arrives.
    pub fn stop_flag(&self) -> StopFlag {
        self.state.stop.clone()
    }

    /// Get the signal state for inspection.
    pub fn state(&self) -> &SignalState {
        &self.state
    }
}
