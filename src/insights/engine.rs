//! Insight engine: scans the ledger for patterns worth flagging.
//!
//! Rules:
//! - Weak win rate on percentage sizing (social proof)
//! - Winning momentum on Masaniello (forecast)
//! - Autopilot hot streak / defensive switch
//! - Autopilot Masaniello target upgrade
//! - Strictly alternating outcomes (anomaly)
//! - Martingale-style stake escalation after losses
//! - Profit lock-in

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::ledger::Ledger;
use crate::models::{
    Configuration, Insight, InsightCategory, MarketSentiment, Outcome, SessionState, Severity,
    StrategyKind, SuggestedAction, Trade,
};

/// Most advisories kept after a merge.
pub const MAX_INSIGHTS: usize = 3;

/// Trades required before any rule runs.
pub const MIN_TRADES: usize = 3;

/// Window for the "recent" win rate.
const RECENT_WINDOW: usize = 5;

/// Stateless rule evaluator.
pub struct InsightEngine;

impl InsightEngine {
    /// Evaluate every rule and merge the matches with `previous`.
    ///
    /// Returns at most [`MAX_INSIGHTS`] entries with distinct ids, newest
    /// first. With fewer than [`MIN_TRADES`] trades no rule runs and the
    /// previous list is kept as is.
    pub fn evaluate(
        ledger: &Ledger,
        session: &SessionState,
        config: &Configuration,
        sentiment: MarketSentiment,
        previous: &[Insight],
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        if ledger.len() < MIN_TRADES {
            return Self::merge(Vec::new(), previous);
        }

        let batch = Self::scan(ledger, session, config, now);
        debug!(
            trades = ledger.len(),
            sentiment = %sentiment,
            matched = batch.len(),
            ids = ?batch.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            "Insight rules evaluated"
        );
        Self::merge(batch, previous)
    }

    /// Run every rule against the current state. No merging or truncation.
    pub fn scan(
        ledger: &Ledger,
        session: &SessionState,
        config: &Configuration,
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        let mut out = Vec::new();
        let trades = ledger.trades();
        let count = trades.len();
        let recent = ledger.last_n(RECENT_WINDOW);
        let win_rate = win_rate_pct(trades);
        let recent_rate = win_rate_pct(recent);

        // Social proof
        if count >= 5 && win_rate < 45.0 && config.strategy == StrategyKind::Percentage {
            out.push(insight(
                "social-masaniello-switch",
                InsightCategory::Social,
                Severity::Info,
                "Community insight",
                format!(
                    "Players with a win rate near {:.0}% did better on Masaniello than on percentage sizing.",
                    win_rate
                ),
                Some(SuggestedAction::SwitchStrategy {
                    target: StrategyKind::Masaniello,
                    fixed_amount: None,
                }),
                now,
            ));
        }

        // Momentum forecast
        if count >= 8
            && config.strategy == StrategyKind::Masaniello
            && ledger.last_n(3).iter().all(Trade::is_win)
            && win_rate > 60.0
        {
            out.push(insight(
                "momentum-raise-target",
                InsightCategory::Prediction,
                Severity::Success,
                "Trend forecast",
                "Three wins in a row on a strong session. Consider raising the Masaniello target by one.".to_string(),
                Some(SuggestedAction::RaiseTarget { delta: 1 }),
                now,
            ));
        }

        if config.autopilot {
            if recent_rate >= 80.0 && config.strategy == StrategyKind::Fixed {
                out.push(insight(
                    "autopilot-compound",
                    InsightCategory::Automation,
                    Severity::Success,
                    "Hot streak",
                    format!(
                        "{:.0}% of the last {} trades won. Percentage sizing would compound the gains.",
                        recent_rate,
                        recent.len()
                    ),
                    Some(SuggestedAction::SwitchStrategy {
                        target: StrategyKind::Percentage,
                        fixed_amount: None,
                    }),
                    now,
                ));
            }

            if recent_rate <= 20.0 && config.strategy == StrategyKind::Percentage {
                let amount = (config.initial_balance * dec!(0.01)).round_dp(2);
                out.push(insight(
                    "autopilot-defensive",
                    InsightCategory::Automation,
                    Severity::Warning,
                    "Preserve capital",
                    format!(
                        "Recent performance is weak. A fixed stake of {:.2} limits the drawdown.",
                        amount
                    ),
                    Some(SuggestedAction::SwitchStrategy {
                        target: StrategyKind::Fixed,
                        fixed_amount: Some(amount),
                    }),
                    now,
                ));
            }

            if config.strategy == StrategyKind::Masaniello && count >= 5 && config.total_events > 0 {
                let expected = config.target_wins as f64 / config.total_events as f64;
                let upgraded = config.target_wins.saturating_add(2).min(config.total_events);
                if win_rate / 100.0 > expected + 0.15 && upgraded > config.target_wins {
                    out.push(insight(
                        "masaniello-target-upgrade",
                        InsightCategory::Automation,
                        Severity::Success,
                        "Ahead of target",
                        format!(
                            "Winning faster than the {}/{} plan requires. Raise the target to {}?",
                            config.target_wins, config.total_events, upgraded
                        ),
                        Some(SuggestedAction::RaiseTarget { delta: 2 }),
                        now,
                    ));
                }
            }
        }

        // Alternating outcomes
        if count >= 6 && is_alternating(ledger.last_n(6)) {
            out.push(insight(
                "pattern-alternating",
                InsightCategory::Anomaly,
                Severity::Critical,
                "Unnatural pattern",
                "Six strictly alternating outcomes. This often points to a rigged feed or a bot; consider pausing.".to_string(),
                None,
                now,
            ));
        }

        // Martingale escalation
        if let [.., prev, last] = trades {
            if prev.outcome == Outcome::Loss
                && last.outcome == Outcome::Loss
                && last.stake > prev.stake * dec!(1.5)
            {
                let limit = session.total_losses.saturating_add(3);
                out.push(insight(
                    "behavior-martingale",
                    InsightCategory::Behavior,
                    Severity::Critical,
                    "Dangerous behavior",
                    format!(
                        "Stake raised to {:.2} after a loss and lost again. A safety brake at {} losses is recommended.",
                        last.stake, limit
                    ),
                    Some(SuggestedAction::SetMaxLosses { limit }),
                    now,
                ));
            }
        }

        // Profit lock-in
        let net = session.current_balance - config.initial_balance;
        if config.initial_balance > Decimal::ZERO && net > Decimal::ZERO {
            let roi = net / config.initial_balance * dec!(100);
            if roi >= dec!(15) {
                out.push(insight(
                    "profit-lock-in",
                    InsightCategory::Profit,
                    Severity::Warning,
                    "Take profit",
                    format!("+{:.1}% ROI this session. Lock in the gains?", roi.to_f64().unwrap_or(0.0)),
                    None,
                    now,
                ));
            }
        }

        out
    }

    /// Merge a fresh batch with earlier advisories.
    ///
    /// The batch wins over a previous insight with the same id. Sorted by
    /// timestamp descending, then severity descending, and truncated to
    /// [`MAX_INSIGHTS`].
    pub fn merge(batch: Vec<Insight>, previous: &[Insight]) -> Vec<Insight> {
        let mut seen = HashSet::new();
        let mut merged: Vec<Insight> = batch
            .into_iter()
            .chain(previous.iter().cloned())
            .filter(|i| seen.insert(i.id.clone()))
            .collect();

        merged.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.severity.cmp(&a.severity))
        });
        merged.truncate(MAX_INSIGHTS);
        merged
    }
}

fn insight(
    id: &str,
    category: InsightCategory,
    severity: Severity,
    title: &str,
    message: String,
    action: Option<SuggestedAction>,
    now: DateTime<Utc>,
) -> Insight {
    Insight {
        id: id.to_string(),
        category,
        severity,
        title: title.to_string(),
        message,
        timestamp: now,
        action,
    }
}

/// Win rate in percent; 0 for an empty slice.
fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

fn is_alternating(trades: &[Trade]) -> bool {
    trades.windows(2).all(|w| w[0].outcome != w[1].outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn play(outcomes: &str, stakes: &[Decimal]) -> Ledger {
        let mut ledger = Ledger::new(dec!(100));
        for (i, c) in outcomes.chars().enumerate() {
            let outcome = Outcome::parse(&c.to_string()).unwrap();
            let stake = stakes.get(i).copied().unwrap_or(dec!(1));
            ledger.append(outcome, stake, dec!(0.85)).unwrap();
        }
        ledger
    }

    fn eval(ledger: &Ledger, config: &Configuration) -> Vec<Insight> {
        InsightEngine::scan(ledger, &ledger.snapshot(), config, Utc::now())
    }

    fn ids(insights: &[Insight]) -> Vec<&str> {
        insights.iter().map(|i| i.id.as_str()).collect()
    }

    fn fixed() -> Configuration {
        Configuration {
            strategy: StrategyKind::Fixed,
            ..Default::default()
        }
    }

    #[test]
    fn test_needs_three_trades() {
        let ledger = play("LL", &[dec!(1), dec!(5)]);
        let out = InsightEngine::evaluate(
            &ledger,
            &ledger.snapshot(),
            &fixed(),
            MarketSentiment::HighVolatility,
            &[],
            Utc::now(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_alternating_pattern() {
        let alternating = eval(&play("WLWLWL", &[]), &fixed());
        let hit = alternating.iter().find(|i| i.id == "pattern-alternating").unwrap();
        assert_eq!(hit.severity, Severity::Critical);
        assert_eq!(hit.category, InsightCategory::Anomaly);
        assert!(hit.action.is_none());

        let broken = eval(&play("WWLLWL", &[]), &fixed());
        assert!(!ids(&broken).contains(&"pattern-alternating"));
    }

    #[test]
    fn test_social_proof_on_percentage() {
        let config = Configuration {
            strategy: StrategyKind::Percentage,
            ..Default::default()
        };
        let out = eval(&play("LLWLL", &[]), &config);
        let hit = out.iter().find(|i| i.id == "social-masaniello-switch").unwrap();
        assert_eq!(
            hit.action,
            Some(SuggestedAction::SwitchStrategy {
                target: StrategyKind::Masaniello,
                fixed_amount: None
            })
        );

        // Only four trades
        assert!(!ids(&eval(&play("LLWL", &[]), &config)).contains(&"social-masaniello-switch"));
    }

    #[test]
    fn test_momentum_forecast() {
        let config = Configuration::default(); // Masaniello
        let out = eval(&play("WWLWLWWW", &[]), &config);
        let hit = out.iter().find(|i| i.id == "momentum-raise-target").unwrap();
        assert_eq!(hit.action, Some(SuggestedAction::RaiseTarget { delta: 1 }));

        // 5/8 wins but the streak is broken
        assert!(!ids(&eval(&play("WWWWLWWL", &[]), &config)).contains(&"momentum-raise-target"));
    }

    #[test]
    fn test_autopilot_rules_need_autopilot() {
        let off = fixed();
        let on = Configuration {
            autopilot: true,
            ..fixed()
        };
        let ledger = play("LWWWW", &[]);
        assert!(!ids(&eval(&ledger, &off)).contains(&"autopilot-compound"));
        assert!(ids(&eval(&ledger, &on)).contains(&"autopilot-compound"));
    }

    #[test]
    fn test_autopilot_defensive_resets_fixed_amount() {
        let config = Configuration {
            autopilot: true,
            strategy: StrategyKind::Percentage,
            initial_balance: dec!(250),
            ..Default::default()
        };
        let out = eval(&play("WWLLLL", &[]), &config);
        let hit = out.iter().find(|i| i.id == "autopilot-defensive").unwrap();
        assert_eq!(
            hit.action,
            Some(SuggestedAction::SwitchStrategy {
                target: StrategyKind::Fixed,
                fixed_amount: Some(dec!(2.50)),
            })
        );
    }

    #[test]
    fn test_masaniello_upgrade_only_when_it_raises() {
        let mut config = Configuration {
            autopilot: true,
            total_events: 10,
            target_wins: 5,
            ..Default::default()
        };
        let ledger = play("WWWWL", &[]);
        assert!(ids(&eval(&ledger, &config)).contains(&"masaniello-target-upgrade"));

        // Already at the cap
        config.target_wins = 10;
        config.total_events = 10;
        assert!(!ids(&eval(&ledger, &config)).contains(&"masaniello-target-upgrade"));
    }

    #[test]
    fn test_martingale_detection() {
        let ledger = play("WLL", &[dec!(1), dec!(2), dec!(4)]);
        let out = eval(&ledger, &fixed());
        let hit = out.iter().find(|i| i.id == "behavior-martingale").unwrap();
        assert_eq!(hit.action, Some(SuggestedAction::SetMaxLosses { limit: 5 }));

        // 1.5x exactly is not an escalation
        let flat = play("WLL", &[dec!(1), dec!(2), dec!(3)]);
        assert!(!ids(&eval(&flat, &fixed())).contains(&"behavior-martingale"));
    }

    #[test]
    fn test_profit_lock_in() {
        let ledger = play("WWW", &[dec!(10), dec!(10), dec!(10)]);
        // +25.5 on 100
        let out = eval(&ledger, &fixed());
        let hit = out.iter().find(|i| i.id == "profit-lock-in").unwrap();
        assert_eq!(hit.severity, Severity::Warning);
        assert!(hit.action.is_none());

        let small = play("WLW", &[dec!(10), dec!(10), dec!(10)]);
        assert!(!ids(&eval(&small, &fixed())).contains(&"profit-lock-in"));
    }

    #[test]
    fn test_sentiment_does_not_take_a_ranked_slot() {
        let now = Utc::now();
        let previous = vec![insight(
            "profit-lock-in",
            InsightCategory::Profit,
            Severity::Warning,
            "Take profit",
            String::new(),
            None,
            now - Duration::seconds(10),
        )];
        let config = Configuration {
            strategy: StrategyKind::Percentage,
            ..Default::default()
        };
        let ledger = play("LWLWLWL", &[]);
        let run = |sentiment| {
            InsightEngine::evaluate(&ledger, &ledger.snapshot(), &config, sentiment, &previous, now)
        };

        let calm = run(MarketSentiment::Neutral);
        let volatile = run(MarketSentiment::HighVolatility);
        assert_eq!(calm, volatile);
        assert!(ids(&volatile).contains(&"profit-lock-in"));
        assert!(!ids(&volatile).contains(&"market-volatility"));
    }

    #[test]
    fn test_merge_prefers_new_batch() {
        let now = Utc::now();
        let old = insight(
            "profit-lock-in",
            InsightCategory::Profit,
            Severity::Warning,
            "Take profit",
            "stale".to_string(),
            None,
            now - Duration::seconds(30),
        );
        let fresh = Insight {
            message: "fresh".to_string(),
            timestamp: now,
            ..old.clone()
        };

        let merged = InsightEngine::merge(vec![fresh], &[old]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].message, "fresh");
    }

    #[test]
    fn test_merged_list_is_bounded_sorted_and_unique() {
        let now = Utc::now();
        let previous: Vec<Insight> = (0..4)
            .map(|i| {
                insight(
                    &format!("old-{i}"),
                    InsightCategory::Strategy,
                    Severity::Info,
                    "old",
                    String::new(),
                    None,
                    now - Duration::seconds(i + 1),
                )
            })
            .collect();

        let config = Configuration {
            autopilot: true,
            strategy: StrategyKind::Percentage,
            ..Default::default()
        };
        let ledger = play("WLWLWL", &[]);
        let out = InsightEngine::evaluate(
            &ledger,
            &ledger.snapshot(),
            &config,
            MarketSentiment::HighVolatility,
            &previous,
            now,
        );

        assert!(out.len() <= MAX_INSIGHTS);
        assert!(out.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        let unique: HashSet<_> = out.iter().map(|i| &i.id).collect();
        assert_eq!(unique.len(), out.len());
        assert_eq!(out[0].id, "pattern-alternating");
    }

    #[test]
    fn test_few_trades_keep_previous() {
        let now = Utc::now();
        let previous = vec![insight(
            "profit-lock-in",
            InsightCategory::Profit,
            Severity::Warning,
            "Take profit",
            String::new(),
            None,
            now,
        )];
        let ledger = play("W", &[]);
        let out = InsightEngine::evaluate(
            &ledger,
            &ledger.snapshot(),
            &fixed(),
            MarketSentiment::Neutral,
            &previous,
            now,
        );
        assert_eq!(out, previous);
    }
}
