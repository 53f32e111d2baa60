//! Rule-based advisories over the trade history.

mod engine;

pub use engine::{InsightEngine, MAX_INSIGHTS, MIN_TRADES};
