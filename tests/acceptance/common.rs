//! Common utilities for acceptance tests.

#![allow(dead_code)] // Not every helper is used by every test module

use pin_common::{DaemonConfig, TimeMark};
use pin_gpio::{simulated_line, EdgeInjector};
use pin_runtime::{LocalRuntime, PulseMonitor, StopFlag};
use std::thread;
use std::time::{Duration, Instant};

/// A monitor wired to a simulated line.
pub struct Harness {
    /// The started monitor.
    pub monitor: PulseMonitor<LocalRuntime>,
    /// Feeds edges into the monitor's line.
    pub injector: EdgeInjector,
}

/// Start a monitor publishing under `component` with default config.
pub fn start(component: &str) -> Harness {
    start_with(component, &DaemonConfig::default())
}

/// Start a monitor publishing under `component`.
pub fn start_with(component: &str, config: &DaemonConfig) -> Harness {
    let (source, injector) = simulated_line(component);
    let monitor = PulseMonitor::start(
        source,
        LocalRuntime::new(),
        component,
        config,
        StopFlag::new(),
    )
    .expect("monitor should start");
    Harness { monitor, injector }
}

impl Harness {
    /// Block until the counting thread has seen `edges` edges in total.
    pub fn wait_for_edges(&self, edges: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.monitor.edge_stats().edges() < edges {
            assert!(
                Instant::now() < deadline,
                "only {} of {edges} edges counted",
                self.monitor.edge_stats().edges()
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Current value of `<component>.<suffix>`.
    pub fn output(&self, name: &str) -> f64 {
        self.monitor
            .runtime()
            .reader(name)
            .unwrap_or_else(|| panic!("no output {name}"))
            .get()
    }
}

/// `mark` shifted forward by `millis`.
pub fn after(mark: TimeMark, millis: i64) -> TimeMark {
    let total = mark.nsec + millis * 1_000_000;
    TimeMark::new(mark.sec + total / 1_000_000_000, total % 1_000_000_000)
}
