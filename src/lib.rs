//! TradeGuard bankroll core
//!
//! Stake sizing, risk gating, Monte-Carlo projection and pattern detection
//! for a sequence of binary win/loss events.

pub mod error;
pub mod insights;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod projection;
pub mod session;
pub mod trading;

pub use error::{Result, TradeGuardError};
pub use insights::InsightEngine;
pub use ledger::Ledger;
pub use metrics::MetricsCalculator;
pub use models::{
    ConfigUpdate, Configuration, Insight, InsightCategory, MarketSentiment, Outcome, RiskTolerance,
    SessionMetrics, SessionState, Severity, StrategyKind, SuggestedAction, Trade,
};
pub use projection::{
    ComparisonParams, ProjectionConfig, ProjectionEngine, Recommendation, SimulationResult,
    StrategyComparisonResult,
};
pub use session::Session;
pub use trading::{LockReason, LockState, MasanielloProgress, MasanielloStatus, SafetyGate, StrategyEngine};
