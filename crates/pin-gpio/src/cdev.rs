//! Linux GPIO character-device edge source.
//!
//! Opens `/dev/gpiochipN`, claims one line as an input and requests
//! rising-edge events on it. Each step fails with its own error variant so
//! the daemon can report exactly which acquisition went wrong.

use crate::{EdgeEvent, EdgeSource};
use gpio_cdev::{Chip, EventRequestFlags, EventType, LineEventHandle, LineRequestFlags};
use pin_common::{PinResult, PinSpeedError, PinTarget};
use tracing::{debug, info};

/// Rising-edge source backed by a GPIO character device line.
pub struct CdevEdgeSource {
    // Field order is drop order: the line request goes before the chip.
    events: LineEventHandle,
    _chip: Chip,
    chip_index: u32,
    line: u32,
}

impl CdevEdgeSource {
    /// Open the chip, get the line and request rising-edge events.
    ///
    /// # Errors
    ///
    /// [`PinSpeedError::ChipOpen`], [`PinSpeedError::LineAcquire`] or
    /// [`PinSpeedError::EdgeRequest`] depending on which step failed. A
    /// failure releases everything acquired before it.
    pub fn open(target: &PinTarget, consumer: &str) -> PinResult<Self> {
        let path = target.chip_path();
        let mut chip = Chip::new(&path).map_err(|e| PinSpeedError::ChipOpen {
            chip: target.chip,
            reason: e.to_string(),
        })?;
        debug!(chip = %path.display(), label = %chip.label(), "GPIO chip opened");

        let line = chip
            .get_line(target.line)
            .map_err(|e| PinSpeedError::LineAcquire {
                line: target.line,
                reason: e.to_string(),
            })?;

        let events = line
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::RISING_EDGE,
                consumer,
            )
            .map_err(|e| PinSpeedError::EdgeRequest {
                line: target.line,
                reason: e.to_string(),
            })?;

        info!(
            chip = target.chip,
            line = target.line,
            consumer,
            "Rising-edge events requested"
        );

        Ok(Self {
            events,
            _chip: chip,
            chip_index: target.chip,
            line: target.line,
        })
    }
}

impl EdgeSource for CdevEdgeSource {
    fn wait_edge(&mut self) -> PinResult<EdgeEvent> {
        let event = self
            .events
            .get_event()
            .map_err(|e| PinSpeedError::GpioRead(e.to_string()))?;
        match event.event_type() {
            EventType::RisingEdge => Ok(EdgeEvent {
                timestamp_ns: event.timestamp(),
            }),
            EventType::FallingEdge => Err(PinSpeedError::GpioRead(
                "unexpected falling edge".into(),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("gpiochip{}:{}", self.chip_index, self.line)
    }
}
