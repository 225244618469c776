//! Periodic sampler.
//!
//! Each tick:
//! 1. Sleep the configured quantum
//! 2. Read the clock
//! 3. Drain the pulse counter
//! 4. Convert (pulses, elapsed) to period and frequency
//! 5. Publish both outputs
//!
//! There is no drift correction. The sleep only sets the cadence; the
//! measurement always uses the elapsed time actually observed.

use crate::counter::PulseCounter;
use crate::output::OutputSlot;
use crate::stop::StopFlag;
use pin_common::{ClockSource, DaemonConfig, PinResult, TimeDelta, TimeMark};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, trace, warn};

/// Period and frequency derived from one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Seconds per pulse, 0 when no pulses were seen.
    pub period: f64,
    /// Pulses per second, 0 when no pulses were seen.
    pub frequency: f64,
}

impl Measurement {
    /// Both values zero.
    pub const ZERO: Measurement = Measurement {
        period: 0.0,
        frequency: 0.0,
    };

    /// Derive a measurement from `pulses` seen over `elapsed`.
    ///
    /// Zero pulses, or a span that is not positive, yield [`Measurement::ZERO`]
    /// so outputs never carry NaN, infinity or a negative rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pulses(pulses: u64, elapsed: TimeDelta) -> Self {
        if pulses == 0 || elapsed.is_non_positive() {
            return Self::ZERO;
        }
        let period = elapsed.as_secs_f64() / pulses as f64;
        Self {
            period,
            frequency: 1.0 / period,
        }
    }
}

/// Running totals for status reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerStats {
    /// Ticks completed.
    pub ticks: u64,
    /// Pulses drained over all ticks.
    pub total_pulses: u64,
    /// Most recent published measurement.
    pub last: Measurement,
}

/// The two write handles the sampler publishes to.
#[derive(Debug)]
pub struct SamplerOutputs {
    /// `<component>.frequency`
    pub frequency: OutputSlot,
    /// `<component>.period`
    pub period: OutputSlot,
}

/// Drains the pulse counter on a fixed cadence and publishes measurements.
#[derive(Debug)]
pub struct Sampler {
    counter: Arc<PulseCounter>,
    outputs: SamplerOutputs,
    interval: Duration,
    clock: ClockSource,
    status_every: u64,
    last_mark: TimeMark,
    stats: SamplerStats,
}

impl Sampler {
    /// Create a sampler whose first interval starts at `start`.
    pub fn new(
        counter: Arc<PulseCounter>,
        outputs: SamplerOutputs,
        config: &DaemonConfig,
        start: TimeMark,
    ) -> Self {
        Self {
            counter,
            outputs,
            interval: config.sample_interval,
            clock: config.clock,
            status_every: config.status_every,
            last_mark: start,
            stats: SamplerStats::default(),
        }
    }

    /// Create a sampler whose first interval starts now.
    ///
    /// # Errors
    ///
    /// Returns [`pin_common::PinSpeedError::Clock`] if the clock cannot be read.
    pub fn starting_now(
        counter: Arc<PulseCounter>,
        outputs: SamplerOutputs,
        config: &DaemonConfig,
    ) -> PinResult<Self> {
        let start = TimeMark::now(config.clock)?;
        Ok(Self::new(counter, outputs, config, start))
    }

    /// Totals so far.
    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Mark the last tick was taken at.
    pub fn last_mark(&self) -> TimeMark {
        self.last_mark
    }

    /// Run one tick as if the clock read `now`.
    pub fn sample_at(&mut self, now: TimeMark) -> Measurement {
        let elapsed = now.since(&self.last_mark);
        let pulses = self.counter.drain();

        let measurement = Measurement::from_pulses(pulses, elapsed);
        if pulses > 0 && elapsed.is_non_positive() {
            warn!(
                pulses,
                elapsed_s = elapsed.as_secs_f64(),
                "Clock did not advance between ticks, publishing zero"
            );
        }

        self.outputs.frequency.set(measurement.frequency);
        self.outputs.period.set(measurement.period);
        self.last_mark = now;

        self.stats.ticks += 1;
        self.stats.total_pulses += pulses;
        self.stats.last = measurement;

        trace!(
            pulses,
            elapsed_s = elapsed.as_secs_f64(),
            frequency_hz = measurement.frequency,
            period_s = measurement.period,
            "Tick"
        );
        measurement
    }

    /// Sleep one quantum, then sample.
    ///
    /// A failed clock read skips the tick without draining, so the pulses
    /// carry over into the next interval.
    pub fn tick(&mut self) -> Option<Measurement> {
        thread::sleep(self.interval);
        match TimeMark::now(self.clock) {
            Ok(now) => Some(self.sample_at(now)),
            Err(e) => {
                warn!(error = %e, "Skipping tick");
                None
            }
        }
    }

    /// Log a status line every `status_every` completed ticks.
    ///
    /// Skipped ticks never report. Returns whether a line was logged.
    fn report_status(&self, sampled: Option<&Measurement>) -> bool {
        if sampled.is_none()
            || self.status_every == 0
            || self.stats.ticks % self.status_every != 0
        {
            return false;
        }
        info!(
            ticks = self.stats.ticks,
            total_pulses = self.stats.total_pulses,
            frequency_hz = self.stats.last.frequency,
            period_s = self.stats.last.period,
            "Periodic status"
        );
        true
    }

    /// Tick until `stop` is set.
    pub fn run(&mut self, stop: &StopFlag) {
        info!(
            interval_ms = self.interval.as_millis(),
            clock = %self.clock,
            "Sampler running"
        );

        while !stop.is_stopped() {
            let sampled = self.tick();
            self.report_status(sampled.as_ref());
        }

        info!(ticks = self.stats.ticks, "Sampler stopped");
    }
}
