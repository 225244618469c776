//! Edge counter task.
//!
//! Blocks on the edge source and bumps the shared [`PulseCounter`] once per
//! rising edge. Read failures are never counted as pulses; the loop simply
//! reads again. The task owns the source, so the line is released when the
//! thread ends (or when the process exits).

use crate::counter::PulseCounter;
use crate::stop::StopFlag;
use pin_common::{PinResult, PinSpeedError};
use pin_gpio::EdgeSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Diagnostic counters kept by the edge counter.
#[derive(Debug, Default)]
pub struct EdgeStats {
    edges: AtomicU64,
    read_errors: AtomicU64,
}

impl EdgeStats {
    /// Rising edges counted since start.
    pub fn edges(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }

    /// Failed reads since start.
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

/// Why the counting loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeCounterExit {
    /// The source reported it will never deliver another edge.
    SourceClosed,
    /// The stop flag was observed.
    Stopped,
}

/// Counts rising edges from one source into a shared counter.
pub struct EdgeCounter<S: EdgeSource> {
    source: S,
    counter: Arc<PulseCounter>,
    stats: Arc<EdgeStats>,
    stop: StopFlag,
}

impl<S: EdgeSource> EdgeCounter<S> {
    /// Create an edge counter feeding `counter`.
    pub fn new(source: S, counter: Arc<PulseCounter>, stop: StopFlag) -> Self {
        Self {
            source,
            counter,
            stats: Arc::new(EdgeStats::default()),
            stop,
        }
    }

    /// Shared handle to the diagnostic counters.
    pub fn stats(&self) -> Arc<EdgeStats> {
        Arc::clone(&self.stats)
    }

    /// Run the counting loop on the current thread.
    ///
    /// Only returns when the source closes or a stop was requested; a real
    /// GPIO line never closes, so in the daemon this runs until exit.
    pub fn run(&mut self) -> EdgeCounterExit {
        debug!(source = %self.source.describe(), "Edge counter started");
        loop {
            match self.source.wait_edge() {
                Ok(_) => {
                    self.counter.increment();
                    self.stats.edges.fetch_add(1, Ordering::Relaxed);
                }
                Err(PinSpeedError::SourceClosed) => {
                    debug!(source = %self.source.describe(), "Edge source closed");
                    return EdgeCounterExit::SourceClosed;
                }
                Err(e) => {
                    let errors = self.stats.read_errors.fetch_add(1, Ordering::Relaxed) + 1;
                    if errors.is_power_of_two() {
                        warn!(error = %e, read_errors = errors, "Edge read failed, retrying");
                    }
                }
            }

            if self.stop.is_stopped() {
                return EdgeCounterExit::Stopped;
            }
        }
    }
}

impl<S: EdgeSource + 'static> EdgeCounter<S> {
    /// Move the counter onto its own named thread.
    ///
    /// # Errors
    ///
    /// Returns [`PinSpeedError::ThreadSpawn`] if the OS refuses the thread.
    pub fn spawn(mut self) -> PinResult<EdgeCounterHandle> {
        let stats = self.stats();
        let handle = thread::Builder::new()
            .name("pin-edge-counter".into())
            .spawn(move || {
                let exit = self.run();
                info!(?exit, edges = self.stats.edges(), "Edge counter stopped");
                exit
            })
            .map_err(|e| PinSpeedError::ThreadSpawn(e.to_string()))?;

        Ok(EdgeCounterHandle {
            handle: Some(handle),
            stats,
        })
    }
}

/// Handle to a spawned edge counter thread.
///
/// Dropping the handle detaches the thread; it keeps counting.
#[derive(Debug)]
pub struct EdgeCounterHandle {
    handle: Option<JoinHandle<EdgeCounterExit>>,
    stats: Arc<EdgeStats>,
}

impl EdgeCounterHandle {
    /// Diagnostic counters of the running task.
    pub fn stats(&self) -> &EdgeStats {
        &self.stats
    }

    /// True once the counting thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the thread to return.
    ///
    /// Blocks forever on a real line; intended for sources that can close.
    ///
    /// # Errors
    ///
    /// Returns [`PinSpeedError::ThreadSpawn`] if the thread panicked or was
    /// already joined.
    pub fn join(mut self) -> PinResult<EdgeCounterExit> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| PinSpeedError::ThreadSpawn("edge counter already joined".into()))?;
        handle
            .join()
            .map_err(|_| PinSpeedError::ThreadSpawn("edge counter thread panicked".into()))
    }
}
