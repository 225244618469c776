//! Integration tests for pin-speed acceptance testing.

mod common;
mod concurrency_test;
mod measurement_test;
