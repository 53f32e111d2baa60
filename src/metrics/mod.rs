//! Session performance statistics.

mod calculator;

pub use calculator::MetricsCalculator;
