//! Concurrency acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - Every edge is counted in exactly one drain while the counting thread
//!   and the sampler run concurrently

use super::common::{after, start};
use std::thread;
use std::time::Duration;

#[test]
fn test_thousand_edges_across_five_drains() {
    let mut h = start("burst");
    let mut mark = h.monitor.sampler_mut().last_mark();

    let injector = h.injector.clone();
    let producer = thread::spawn(move || {
        for i in 0..1000 {
            injector.edge();
            if i % 50 == 0 {
                thread::sleep(Duration::from_micros(200));
            }
        }
    });

    for _ in 0..4 {
        thread::sleep(Duration::from_millis(2));
        mark = after(mark, 100);
        h.monitor.sampler_mut().sample_at(mark);
    }

    producer.join().unwrap();
    h.wait_for_edges(1000);
    mark = after(mark, 100);
    h.monitor.sampler_mut().sample_at(mark);

    let stats = h.monitor.sampler_mut().stats();
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.total_pulses, 1000);
}

#[test]
fn test_drain_with_no_new_edges_is_zero() {
    let mut h = start("idle");
    let t0 = h.monitor.sampler_mut().last_mark();

    h.injector.edges(3);
    h.wait_for_edges(3);
    h.monitor.sampler_mut().sample_at(after(t0, 100));
    let second = h.monitor.sampler_mut().sample_at(after(t0, 200));

    assert_eq!(second.frequency, 0.0);
    assert_eq!(h.monitor.sampler_mut().stats().total_pulses, 3);
}
