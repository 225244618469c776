//! Edge sources for the pulse counter.
//!
//! This crate provides:
//! - [`EdgeSource`] trait, the blocking "next rising edge" interface
//! - [`cdev`] module with the Linux GPIO character-device source
//! - [`simulated`] module with a channel-fed source for tests and dry runs

#[cfg(all(target_os = "linux", feature = "cdev"))]
pub mod cdev;
pub mod simulated;

#[cfg(all(target_os = "linux", feature = "cdev"))]
pub use cdev::CdevEdgeSource;
pub use simulated::*;

use pin_common::PinResult;

/// One rising-edge notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Kernel timestamp of the edge in nanoseconds, if the source has one.
    pub timestamp_ns: u64,
}

/// Blocking source of rising-edge notifications.
///
/// Implementations own the underlying line; dropping the source releases
/// the line and then its chip.
pub trait EdgeSource: Send {
    /// Block until the next rising edge arrives.
    ///
    /// There is no timeout. A transient failure is returned as
    /// [`pin_common::PinSpeedError::GpioRead`]; callers retry.
    /// [`pin_common::PinSpeedError::SourceClosed`] means no further
    /// events will ever arrive.
    fn wait_edge(&mut self) -> PinResult<EdgeEvent>;

    /// Short description for log output.
    fn describe(&self) -> String;
}

impl<S: EdgeSource + ?Sized> EdgeSource for Box<S> {
    fn wait_edge(&mut self) -> PinResult<EdgeEvent> {
        (**self).wait_edge()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
