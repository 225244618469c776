use thiserror::Error;

/// Errors raised while setting up or running the pulse monitor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PinSpeedError {
    /// Command-line argument rejected before any resource was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The GPIO chip could not be opened.
    #[error("failed to open chip number {chip}: {reason}")]
    ChipOpen {
        /// Chip index (`/dev/gpiochipN`).
        chip: u32,
        /// Underlying cause.
        reason: String,
    },

    /// The requested line does not exist or is held by another consumer.
    #[error("failed to get line {line}: {reason}")]
    LineAcquire {
        /// Line offset on the chip.
        line: u32,
        /// Underlying cause.
        reason: String,
    },

    /// Rising-edge notifications could not be requested on the line.
    #[error("failed to request rising edge events on line {line}: {reason}")]
    EdgeRequest {
        /// Line offset on the chip.
        line: u32,
        /// Underlying cause.
        reason: String,
    },

    /// A blocking edge read returned an error.
    #[error("edge read failed: {0}")]
    GpioRead(String),

    /// The edge source will never deliver another event.
    #[error("edge source closed")]
    SourceClosed,

    /// The counting thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// The control runtime refused the component registration.
    #[error("{component}: runtime init failed: {reason}")]
    RuntimeInit {
        /// Component name passed to init.
        component: String,
        /// Underlying cause.
        reason: String,
    },

    /// An output value could not be created.
    #[error("failed to create output {name}: {reason}")]
    OutputCreate {
        /// Fully-qualified output name.
        name: String,
        /// Underlying cause.
        reason: String,
    },

    /// Reading the system clock failed.
    #[error("clock read failed: {0}")]
    Clock(String),
}

/// Convenience type alias for pin-speed operations.
pub type PinResult<T> = Result<T, PinSpeedError>;
