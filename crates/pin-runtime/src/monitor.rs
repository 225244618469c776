//! Startup sequence tying the edge counter, control runtime and sampler.
//!
//! Order: counter → edge counter thread → runtime init → outputs (both 0)
//! → ready → sampler. A failure at any step unwinds what came before it:
//! the runtime registration is shut down by its guard, then the counting
//! thread is told to stop. The thread owns the line, so a blocked real line
//! is only released once its next event arrives (or the process exits).

use crate::counter::PulseCounter;
use crate::edge_counter::{EdgeCounter, EdgeCounterHandle, EdgeStats};
use crate::output::{ComponentId, ControlRuntime, OutputSlot};
use crate::sampler::{Sampler, SamplerOutputs};
use crate::stop::StopFlag;
use pin_common::{DaemonConfig, PinResult};
use pin_gpio::EdgeSource;
use std::sync::Arc;
use tracing::{debug, info};

/// A live registration with the control runtime.
///
/// Dropping the guard calls [`ControlRuntime::shutdown`].
#[derive(Debug)]
pub struct Registration<R: ControlRuntime> {
    runtime: R,
    id: ComponentId,
    component: String,
}

impl<R: ControlRuntime> Registration<R> {
    /// Register `component` with `runtime`.
    ///
    /// # Errors
    ///
    /// Propagates the runtime's init error.
    pub fn init(mut runtime: R, component: &str) -> PinResult<Self> {
        let id = runtime.init(component)?;
        Ok(Self {
            runtime,
            id,
            component: component.to_string(),
        })
    }

    /// Create `<component>.<suffix>`.
    ///
    /// # Errors
    ///
    /// Propagates the runtime's output-creation error.
    pub fn create_output(&mut self, suffix: &str) -> PinResult<OutputSlot> {
        let name = format!("{}.{suffix}", self.component);
        self.runtime.create_output(self.id, &name)
    }

    /// Mark the component ready.
    ///
    /// # Errors
    ///
    /// Propagates the runtime's error.
    pub fn mark_ready(&mut self) -> PinResult<()> {
        self.runtime.mark_ready(self.id)
    }

    /// The runtime being registered with.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Assigned component id.
    pub fn id(&self) -> ComponentId {
        self.id
    }
}

impl<R: ControlRuntime> Drop for Registration<R> {
    fn drop(&mut self) {
        debug!(component = %self.component, id = %self.id, "Shutting down runtime registration");
        self.runtime.shutdown(self.id);
    }
}

/// Stops the counting thread unless disarmed.
struct CounterRelease {
    stop: StopFlag,
    armed: bool,
}

impl CounterRelease {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CounterRelease {
    fn drop(&mut self) {
        if self.armed {
            debug!("Startup failed, stopping edge counter");
            self.stop.request_stop();
        }
    }
}

/// A fully started pulse monitor, ready to run its sampling loop.
pub struct PulseMonitor<R: ControlRuntime> {
    sampler: Sampler,
    edge_counter: EdgeCounterHandle,
    registration: Registration<R>,
    stop: StopFlag,
    counter_stop: StopFlag,
}

impl<R: ControlRuntime> PulseMonitor<R> {
    /// Start counting edges from `source` and publish under `component`.
    ///
    /// The source must already be acquired; it is moved onto the counting
    /// thread.
    ///
    /// # Errors
    ///
    /// Any configuration, thread spawn, runtime or clock error. Earlier
    /// steps are unwound before returning.
    pub fn start<S: EdgeSource + 'static>(
        source: S,
        runtime: R,
        component: &str,
        config: &DaemonConfig,
        stop: StopFlag,
    ) -> PinResult<Self> {
        config.validate()?;
        let source_name = source.describe();

        let counter = PulseCounter::shared();
        let counter_stop = StopFlag::new();
        let edge_counter =
            EdgeCounter::new(source, Arc::clone(&counter), counter_stop.clone()).spawn()?;
        // Declared before the registration so it drops after it.
        let release = CounterRelease {
            stop: counter_stop.clone(),
            armed: true,
        };
        debug!(source = %source_name, "Edge counter thread started");

        let mut registration = Registration::init(runtime, component)?;
        let frequency = registration.create_output("frequency")?;
        let period = registration.create_output("period")?;
        frequency.set(0.0);
        period.set(0.0);
        registration.mark_ready()?;

        let sampler =
            Sampler::starting_now(counter, SamplerOutputs { frequency, period }, config)?;

        release.disarm();
        info!(component, source = %source_name, "Pulse monitor started");
        Ok(Self {
            sampler,
            edge_counter,
            registration,
            stop,
            counter_stop,
        })
    }

    /// Run the sampling loop until the stop flag is set.
    pub fn run(&mut self) {
        self.sampler.run(&self.stop);
    }

    /// Direct access to the sampler, for single-stepping.
    pub fn sampler_mut(&mut self) -> &mut Sampler {
        &mut self.sampler
    }

    /// Edge counter diagnostics.
    pub fn edge_stats(&self) -> &EdgeStats {
        self.edge_counter.stats()
    }

    /// The control runtime holding the outputs.
    pub fn runtime(&self) -> &R {
        self.registration.runtime()
    }

    /// Stop flag shared with both loops.
    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Tear down: request stop and release the runtime registration.
    ///
    /// The counting thread is detached; it ends after its next event or
    /// with the process.
    pub fn shutdown(self) {
        self.stop.request_stop();
        self.counter_stop.request_stop();
        let stats = self.sampler.stats();
        info!(
            ticks = stats.ticks,
            total_pulses = stats.total_pulses,
            edges = self.edge_counter.stats().edges(),
            read_errors = self.edge_counter.stats().read_errors(),
            "Pulse monitor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::LocalRuntime;
    use pin_common::{PinSpeedError, TimeMark};
    use pin_gpio::simulated_line;
    use std::time::{Duration, Instant};

    fn wait_for_edges(monitor: &PulseMonitor<LocalRuntime>, edges: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while monitor.edge_stats().edges() < edges && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_start_registers_zeroed_outputs() {
        let (source, _injector) = simulated_line("m");
        let monitor = PulseMonitor::start(
            source,
            LocalRuntime::new(),
            "speedtest",
            &DaemonConfig::default(),
            StopFlag::new(),
        )
        .unwrap();

        let rt = monitor.runtime();
        assert_eq!(rt.component_count(), 1);
        assert_eq!(rt.reader("speedtest.frequency").unwrap().get(), 0.0);
        assert_eq!(rt.reader("speedtest.period").unwrap().get(), 0.0);
        assert!(rt.is_ready(ComponentId(0)));
    }

    #[test]
    fn test_edges_flow_to_outputs() {
        let (source, injector) = simulated_line("m");
        let mut monitor = PulseMonitor::start(
            source,
            LocalRuntime::new(),
            "spindle",
            &DaemonConfig::default(),
            StopFlag::new(),
        )
        .unwrap();

        injector.edges(20);
        wait_for_edges(&monitor, 20);

        let start = monitor.sampler_mut().last_mark();
        let now = TimeMark::new(start.sec + 2, start.nsec);
        let m = monitor.sampler_mut().sample_at(now);
        assert!((m.frequency - 10.0).abs() < 1e-6);

        let reader = monitor.runtime().reader("spindle.period").unwrap();
        assert!((reader.get() - 0.1).abs() < 1e-9);
        monitor.shutdown();
    }

    #[test]
    fn test_runtime_failure_is_reported() {
        let (source, _injector) = simulated_line("m");
        let result = PulseMonitor::start(
            source,
            LocalRuntime::new(),
            "bad name",
            &DaemonConfig::default(),
            StopFlag::new(),
        );
        assert!(matches!(result, Err(PinSpeedError::RuntimeInit { .. })));
    }

    fn wait_for_release(injector: &pin_gpio::EdgeInjector) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !injector.edge() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_failed_start_releases_source() {
        let (source, injector) = simulated_line("m");
        let stop = StopFlag::new();
        let result = PulseMonitor::start(
            source,
            LocalRuntime::new(),
            "bad name",
            &DaemonConfig::default(),
            stop.clone(),
        );
        assert!(result.is_err());
        // The caller's flag is left alone.
        assert!(!stop.is_stopped());
        assert!(wait_for_release(&injector));
    }

    #[test]
    fn test_shutdown_releases_source() {
        let (source, injector) = simulated_line("m");
        let monitor = PulseMonitor::start(
            source,
            LocalRuntime::new(),
            "speedtest",
            &DaemonConfig::default(),
            StopFlag::new(),
        )
        .unwrap();
        monitor.shutdown();
        assert!(wait_for_release(&injector));
    }

    #[test]
    fn test_invalid_config_rejected_before_spawn() {
        let (source, injector) = simulated_line("m");
        let config = DaemonConfig {
            sample_interval: Duration::ZERO,
            ..DaemonConfig::default()
        };
        let result =
            PulseMonitor::start(source, LocalRuntime::new(), "x", &config, StopFlag::new());
        assert!(matches!(result, Err(PinSpeedError::Config(_))));
        // Source was dropped without a thread ever reading it.
        assert!(!injector.edge());
    }

    #[test]
    fn test_registration_guard_shuts_down() {
        struct Recording {
            log: Arc<std::sync::Mutex<Vec<String>>>,
        }
        impl ControlRuntime for Recording {
            fn init(&mut self, name: &str) -> PinResult<ComponentId> {
                self.log.lock().unwrap().push(format!("init {name}"));
                Ok(ComponentId(7))
            }
            fn create_output(&mut self, _id: ComponentId, name: &str) -> PinResult<OutputSlot> {
                if name.ends_with(".period") {
                    return Err(PinSpeedError::OutputCreate {
                        name: name.into(),
                        reason: "no shared memory".into(),
                    });
                }
                self.log.lock().unwrap().push(format!("create {name}"));
                Ok(OutputSlot::new(name).0)
            }
            fn mark_ready(&mut self, _id: ComponentId) -> PinResult<()> {
                self.log.lock().unwrap().push("ready".into());
                Ok(())
            }
            fn shutdown(&mut self, id: ComponentId) {
                self.log.lock().unwrap().push(format!("shutdown {}", id.0));
            }
        }

        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (source, _injector) = simulated_line("m");
        let result = PulseMonitor::start(
            source,
            Recording {
                log: Arc::clone(&log),
            },
            "enc",
            &DaemonConfig::default(),
            StopFlag::new(),
        );
        assert!(matches!(result, Err(PinSpeedError::OutputCreate { .. })));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["init enc", "create enc.frequency", "shutdown 7"]
        );
    }
}
