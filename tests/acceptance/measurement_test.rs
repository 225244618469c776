//! Frequency / period acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - n pulses over T seconds publish `period = T/n`, `frequency = n/T`
//! - An interval without pulses publishes exactly 0 for both values
//! - Read errors on the line never count as pulses

use super::common::{after, start, start_with};
use pin_common::DaemonConfig;
use std::thread;
use std::time::Duration;

#[test]
fn test_ten_pulses_in_one_second_then_silence() {
    let mut h = start("speedtest");
    let t0 = h.monitor.sampler_mut().last_mark();

    let injector = h.injector.clone();
    let producer = thread::spawn(move || {
        for _ in 0..10 {
            thread::sleep(Duration::from_millis(100));
            injector.edge();
        }
    });
    producer.join().unwrap();
    h.wait_for_edges(10);

    let m = h.monitor.sampler_mut().sample_at(after(t0, 1000));
    assert!((m.frequency - 10.0).abs() < 1e-6, "frequency {}", m.frequency);
    assert!((m.period - 0.1).abs() < 1e-9, "period {}", m.period);
    assert!((h.output("speedtest.frequency") - 10.0).abs() < 1e-6);
    assert!((h.output("speedtest.period") - 0.1).abs() < 1e-9);

    let m = h.monitor.sampler_mut().sample_at(after(t0, 1100));
    assert_eq!(m.frequency, 0.0);
    assert_eq!(m.period, 0.0);
    assert_eq!(h.output("speedtest.frequency"), 0.0);
    assert_eq!(h.output("speedtest.period"), 0.0);
}

#[test]
fn test_rates_across_intervals() {
    let mut h = start("spindle");
    let mut mark = h.monitor.sampler_mut().last_mark();
    let mut seen = 0;

    for (pulses, millis) in [(1u64, 100i64), (25, 100), (3, 250), (400, 1000)] {
        h.injector.edges(usize::try_from(pulses).unwrap());
        seen += pulses;
        h.wait_for_edges(seen);

        mark = after(mark, millis);
        let m = h.monitor.sampler_mut().sample_at(mark);

        #[allow(clippy::cast_precision_loss)]
        let (n, t) = (pulses as f64, millis as f64 / 1000.0);
        assert!((m.period - t / n).abs() < 1e-9, "period for {pulses}/{millis}ms");
        assert!((m.frequency - n / t).abs() < 1e-6, "frequency for {pulses}/{millis}ms");
    }
}

#[test]
fn test_read_errors_do_not_count() {
    let mut h = start("noisy");
    let t0 = h.monitor.sampler_mut().last_mark();

    for _ in 0..4 {
        h.injector.edge();
        h.injector.read_error("EIO");
    }
    h.wait_for_edges(4);
    while h.monitor.edge_stats().read_errors() < 4 {
        thread::sleep(Duration::from_millis(1));
    }

    let m = h.monitor.sampler_mut().sample_at(after(t0, 400));
    assert!((m.frequency - 10.0).abs() < 1e-6);
    assert_eq!(h.monitor.edge_stats().read_errors(), 4);
}

#[test]
fn test_real_clock_ticks_publish_consistent_pair() {
    let config = DaemonConfig {
        sample_interval: Duration::from_millis(20),
        ..DaemonConfig::default()
    };
    let mut h = start_with("wall", &config);

    h.injector.edges(50);
    h.wait_for_edges(50);
    let m = h
        .monitor
        .sampler_mut()
        .tick()
        .expect("clock should be readable");
    assert!(m.frequency > 0.0);
    assert!((m.frequency * m.period - 1.0).abs() < 1e-9);

    let idle = h.monitor.sampler_mut().tick().expect("clock should be readable");
    assert_eq!(idle.frequency, 0.0);
    assert_eq!(idle.period, 0.0);
}
