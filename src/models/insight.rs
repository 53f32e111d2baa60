//! Advisory messages produced by the insight engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{ConfigUpdate, Configuration, StrategyKind};
use crate::error::TradeGuardError;

/// Market mood supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    HighVolatility,
    #[default]
    Neutral,
}

impl MarketSentiment {
    /// Adjustment applied to the base win probability in projections.
    pub fn win_probability_offset(&self) -> f64 {
        match self {
            MarketSentiment::HighVolatility => -0.10,
            MarketSentiment::Bullish => 0.05,
            MarketSentiment::Bearish => -0.05,
            MarketSentiment::Neutral => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSentiment::Bullish => "BULLISH",
            MarketSentiment::Bearish => "BEARISH",
            MarketSentiment::HighVolatility => "HIGH_VOLATILITY",
            MarketSentiment::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketSentiment {
    type Err = TradeGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "bullish" => Ok(Self::Bullish),
            "bearish" => Ok(Self::Bearish),
            "high_volatility" | "volatile" => Ok(Self::HighVolatility),
            "neutral" => Ok(Self::Neutral),
            other => Err(TradeGuardError::invalid_config(
                "sentiment",
                format!("unknown sentiment `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InsightCategory {
    Strategy,
    Profit,
    Anomaly,
    Behavior,
    Automation,
    Social,
    Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Command attached to an insight. The caller decides whether to apply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    /// Change strategy, optionally resetting the fixed stake
    SwitchStrategy {
        target: StrategyKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_amount: Option<rust_decimal::Decimal>,
    },
    /// Raise the Masaniello target, capped at the number of events
    RaiseTarget { delta: u32 },
    /// Set the loss-count safety brake
    SetMaxLosses { limit: u32 },
}

impl SuggestedAction {
    /// Translate the command into a configuration change against `config`.
    pub fn to_update(&self, config: &Configuration) -> ConfigUpdate {
        match self {
            SuggestedAction::SwitchStrategy { target, fixed_amount } => ConfigUpdate {
                strategy: Some(*target),
                fixed_amount: *fixed_amount,
                ..Default::default()
            },
            SuggestedAction::RaiseTarget { delta } => ConfigUpdate {
                target_wins: Some(
                    config
                        .target_wins
                        .saturating_add(*delta)
                        .min(config.total_events),
                ),
                ..Default::default()
            },
            SuggestedAction::SetMaxLosses { limit } => ConfigUpdate {
                max_losses_allowed: Some(*limit),
                ..Default::default()
            },
        }
    }

    /// Short label for display.
    pub fn label(&self) -> String {
        match self {
            SuggestedAction::SwitchStrategy { target, fixed_amount: Some(amount) } => {
                format!("Switch to {} ({:.2} per trade)", target, amount)
            }
            SuggestedAction::SwitchStrategy { target, fixed_amount: None } => {
                format!("Switch to {}", target)
            }
            SuggestedAction::RaiseTarget { delta } => format!("Raise target (+{})", delta),
            SuggestedAction::SetMaxLosses { limit } => format!("Set safety brake at {} losses", limit),
        }
    }
}

/// A transient advisory message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable identifier used for de-duplication
    pub id: String,
    pub category: InsightCategory,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub action: Option<SuggestedAction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_action_serializes_as_tagged_command() {
        let action = SuggestedAction::SwitchStrategy {
            target: StrategyKind::Percentage,
            fixed_amount: None,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "SWITCH_STRATEGY", "target": "PERCENTAGE"}));

        let raise: SuggestedAction =
            serde_json::from_value(serde_json::json!({"kind": "RAISE_TARGET", "delta": 1})).unwrap();
        assert_eq!(raise, SuggestedAction::RaiseTarget { delta: 1 });
    }

    #[test]
    fn test_raise_target_is_capped() {
        let config = Configuration {
            total_events: 10,
            target_wins: 9,
            ..Default::default()
        };
        let update = SuggestedAction::RaiseTarget { delta: 2 }.to_update(&config);
        assert_eq!(update.target_wins, Some(10));
    }

    #[test]
    fn test_defensive_switch_update() {
        let config = Configuration::default();
        let update = SuggestedAction::SwitchStrategy {
            target: StrategyKind::Fixed,
            fixed_amount: Some(dec!(1)),
        }
        .to_update(&config);
        assert_eq!(update.strategy, Some(StrategyKind::Fixed));
        assert_eq!(update.fixed_amount, Some(dec!(1)));
    }

    #[test]
    fn test_sentiment_parse() {
        assert_eq!("high-volatility".parse::<MarketSentiment>().unwrap(), MarketSentiment::HighVolatility);
        assert!("sideways".parse::<MarketSentiment>().is_err());
    }
}
