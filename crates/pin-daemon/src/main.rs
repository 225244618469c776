//! pin-speed daemon entry point.
//!
//! Counts rising edges on one GPIO line and publishes
//! `<component>.frequency` and `<component>.period` every sampling tick.

mod signals;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use pin_common::{DaemonConfig, PinSpeedError, PinTarget};
use pin_gpio::{simulated_line, EdgeInjector, EdgeSource};
use pin_runtime::{LocalRuntime, PulseMonitor};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::signals::SignalHandler;

/// Exit status for every setup failure.
const SETUP_FAILURE: i32 = -1;

const USAGE: &str = "Usage: pin-speed <chip number> <line number> <component name>";

/// pin-speed command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "pin-speed",
    about = "Measure pulse frequency and period on a GPIO line",
    version,
    long_about = None
)]
struct Args {
    /// GPIO chip number (opens /dev/gpiochipN).
    #[arg(allow_negative_numbers = true)]
    chip: i64,

    /// Line offset on the chip.
    #[arg(allow_negative_numbers = true)]
    line: i64,

    /// Component name; prefix of the published values and GPIO consumer label.
    component: String,

    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sampling interval, e.g. "100ms" (overrides config file).
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Feed the counter from a generated pulse train at this rate instead
    /// of opening the GPIO line.
    #[arg(long, value_name = "HZ")]
    simulate_hz: Option<f64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(SETUP_FAILURE);
            }
        },
    };

    let target = match PinTarget::from_raw(args.chip, args.line, &args.component) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("{e}");
            println!("{USAGE}");
            std::process::exit(SETUP_FAILURE);
        }
    };

    init_logging(&args.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting pin-speed");

    if let Err(e) = run(&args, &target) {
        error!(component = %target.component, "{e:#}");
        eprintln!("{}: ERROR: {e:#}", target.component);
        std::process::exit(SETUP_FAILURE);
    }
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "pin_speed={level},pin_runtime={level},pin_gpio={level},pin_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from `--config` or use defaults, then apply overrides.
fn load_config(args: &Args) -> Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(?path, "Loading config");
            DaemonConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => DaemonConfig::default(),
    };

    if let Some(interval) = args.interval {
        config.sample_interval = interval;
    }
    config.validate()?;
    Ok(config)
}

/// Acquire the GPIO line, start the monitor and run until signalled.
fn run(args: &Args, target: &PinTarget) -> Result<()> {
    let config = load_config(args)?;
    info!(
        chip = target.chip,
        line = target.line,
        component = %target.component,
        interval = %humantime::format_duration(config.sample_interval),
        clock = %config.clock,
        "Configuration loaded"
    );

    let signal_handler = SignalHandler::new().context("Failed to set up signal handlers")?;

    let source: Box<dyn EdgeSource> = match args.simulate_hz {
        Some(hz) => Box::new(start_pulse_generator(hz, target)?),
        None => open_line(target, config.consumer_for(target))?,
    };

    let mut monitor = PulseMonitor::start(
        source,
        LocalRuntime::new(),
        &target.component,
        &config,
        signal_handler.stop_flag(),
    )?;

    monitor.run();

    for (name, value) in monitor.runtime().snapshot() {
        debug!(output = %name, value, "Final value");
    }
    monitor.shutdown();
    info!(
        signals = signal_handler.state().signal_count(),
        "pin-speed shutdown complete"
    );
    Ok(())
}

#[cfg(all(target_os = "linux", feature = "cdev"))]
fn open_line(target: &PinTarget, consumer: &str) -> Result<Box<dyn EdgeSource>> {
    let source = pin_gpio::CdevEdgeSource::open(target, consumer)?;
    Ok(Box::new(source))
}

#[cfg(not(all(target_os = "linux", feature = "cdev")))]
fn open_line(target: &PinTarget, _consumer: &str) -> Result<Box<dyn EdgeSource>> {
    Err(PinSpeedError::ChipOpen {
        chip: target.chip,
        reason: "GPIO character devices are not supported in this build".into(),
    }
    .into())
}

/// Spawn a thread producing rising edges at `hz` into a simulated line.
fn start_pulse_generator(hz: f64, target: &PinTarget) -> Result<pin_gpio::SimulatedEdgeSource> {
    if !(hz.is_finite() && hz > 0.0) {
        return Err(PinSpeedError::InvalidArgument(format!("simulated rate {hz} Hz")).into());
    }
    let (source, injector) = simulated_line(&format!("gpiochip{}:{}", target.chip, target.line));
    let period = Duration::from_secs_f64(1.0 / hz);

    std::thread::Builder::new()
        .name("pin-pulse-gen".into())
        .spawn(move || generate_pulses(&injector, period))
        .map_err(|e| PinSpeedError::ThreadSpawn(e.to_string()))?;

    info!(hz, "Simulated pulse train started");
    Ok(source)
}

fn generate_pulses(injector: &EdgeInjector, period: Duration) {
    while injector.edge() {
        std::thread::sleep(period);
    }
}
