//! Monte-Carlo projections and their blocking-pool runners.

mod monte_carlo;
mod worker;

pub use monte_carlo::{
    ComparisonParams, ProjectionConfig, ProjectionEngine, Recommendation, SimulationResult,
    StrategyComparisonResult,
};
pub use worker::{spawn_comparison, spawn_next5};
