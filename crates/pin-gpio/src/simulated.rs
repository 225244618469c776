//! Simulated edge source for testing.
//!
//! [`simulated_line`] returns a source and an [`EdgeInjector`]. Anything the
//! injector sends is delivered, in order, to the blocking
//! [`EdgeSource::wait_edge`] call. Dropping every injector closes the line.

use crate::{EdgeEvent, EdgeSource};
use pin_common::{PinResult, PinSpeedError};
use std::sync::mpsc::{self, Receiver, Sender};

/// What the simulated line delivers next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedEvent {
    /// A rising edge.
    Edge(EdgeEvent),
    /// A failed read with the given message.
    ReadError(String),
}

/// Handle used to feed a [`SimulatedEdgeSource`].
#[derive(Debug, Clone)]
pub struct EdgeInjector {
    tx: Sender<SimulatedEvent>,
}

impl EdgeInjector {
    /// Deliver one rising edge. Returns false once the source is gone.
    pub fn edge(&self) -> bool {
        self.tx.send(SimulatedEvent::Edge(EdgeEvent::default())).is_ok()
    }

    /// Deliver `count` rising edges back to back.
    pub fn edges(&self, count: usize) -> bool {
        (0..count).all(|_| self.edge())
    }

    /// Make the next read fail.
    pub fn read_error(&self, message: &str) -> bool {
        self.tx
            .send(SimulatedEvent::ReadError(message.to_string()))
            .is_ok()
    }
}

/// Channel-fed stand-in for a GPIO line.
#[derive(Debug)]
pub struct SimulatedEdgeSource {
    rx: Receiver<SimulatedEvent>,
    name: String,
}

/// Create a connected source / injector pair.
#[must_use]
pub fn simulated_line(name: &str) -> (SimulatedEdgeSource, EdgeInjector) {
    let (tx, rx) = mpsc::channel();
    (
        SimulatedEdgeSource {
            rx,
            name: name.to_string(),
        },
        EdgeInjector { tx },
    )
}

impl EdgeSource for SimulatedEdgeSource {
    fn wait_edge(&mut self) -> PinResult<EdgeEvent> {
        match self.rx.recv() {
            Ok(SimulatedEvent::Edge(event)) => Ok(event),
            Ok(SimulatedEvent::ReadError(msg)) => Err(PinSpeedError::GpioRead(msg)),
            Err(_) => Err(PinSpeedError::SourceClosed),
        }
    }

    fn describe(&self) -> String {
        format!("simulated:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_delivered_in_order() {
        let (mut source, injector) = simulated_line("test");
        assert!(injector.edge());
        assert!(injector.read_error("EIO"));
        assert!(injector.edge());

        assert!(source.wait_edge().is_ok());
        assert_eq!(
            source.wait_edge(),
            Err(PinSpeedError::GpioRead("EIO".into()))
        );
        assert!(source.wait_edge().is_ok());
    }

    #[test]
    fn test_closed_when_injectors_dropped() {
        let (mut source, injector) = simulated_line("test");
        assert!(injector.edges(2));
        drop(injector);

        assert!(source.wait_edge().is_ok());
        assert!(source.wait_edge().is_ok());
        assert_eq!(source.wait_edge(), Err(PinSpeedError::SourceClosed));
    }

    #[test]
    fn test_injector_reports_dropped_source() {
        let (source, injector) = simulated_line("test");
        assert_eq!(source.describe(), "simulated:test");
        drop(source);
        assert!(!injector.edge());
    }
}
