//! Data models for trades, configuration, session state and advisories.

mod config;
mod insight;
mod metrics;
mod session;
mod trade;

pub use config::{ConfigUpdate, Configuration, RiskTolerance, StrategyKind, CONFIG_KEYS};
pub use insight::{Insight, InsightCategory, MarketSentiment, Severity, SuggestedAction};
pub use metrics::SessionMetrics;
pub use session::SessionState;
pub use trade::{Outcome, Trade};
