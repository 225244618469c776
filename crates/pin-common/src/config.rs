//! Daemon tunables.
//!
//! The GPIO target itself always comes from the command line; this file
//! only carries knobs with sensible defaults, optionally loaded from TOML.

use crate::error::{PinResult, PinSpeedError};
use crate::time::ClockSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default sampling quantum.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Sleep between two sampling ticks.
    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,

    /// Clock used to measure elapsed time between ticks.
    pub clock: ClockSource,

    /// Emit a status line every N ticks (0 disables).
    pub status_every: u64,

    /// GPIO options.
    pub gpio: GpioConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            clock: ClockSource::Realtime,
            status_every: 600,
            gpio: GpioConfig::default(),
        }
    }
}

/// GPIO line options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GpioConfig {
    /// Consumer label shown by `gpioinfo`; defaults to the component name.
    pub consumer: Option<String>,
}

/// The line to watch and the name to publish under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinTarget {
    /// GPIO chip index (`/dev/gpiochipN`).
    pub chip: u32,
    /// Line offset on the chip.
    pub line: u32,
    /// Component name; prefix of the published output names.
    pub component: String,
}

impl PinTarget {
    /// Validate raw command-line values.
    ///
    /// # Errors
    ///
    /// Returns [`PinSpeedError::InvalidArgument`] for negative or
    /// out-of-range indices and for an empty component name.
    pub fn from_raw(chip: i64, line: i64, component: &str) -> PinResult<Self> {
        let chip = u32::try_from(chip)
            .map_err(|_| PinSpeedError::InvalidArgument(format!("chip number {chip}")))?;
        let line = u32::try_from(line)
            .map_err(|_| PinSpeedError::InvalidArgument(format!("line number {line}")))?;
        if component.trim().is_empty() {
            return Err(PinSpeedError::InvalidArgument(
                "component name is empty".into(),
            ));
        }
        Ok(Self {
            chip,
            line,
            component: component.to_string(),
        })
    }

    /// Device node for the chip.
    #[must_use]
    pub fn chip_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/gpiochip{}", self.chip))
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check values that parse but cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`PinSpeedError::Config`] for a zero sampling interval.
    pub fn validate(&self) -> PinResult<()> {
        if self.sample_interval.is_zero() {
            return Err(PinSpeedError::Config(
                "sample_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Consumer label for the given target.
    #[must_use]
    pub fn consumer_for<'a>(&'a self, target: &'a PinTarget) -> &'a str {
        self.gpio.consumer.as_deref().unwrap_or(&target.component)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
