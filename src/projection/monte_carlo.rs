//! Monte-Carlo projections of near-term bankroll outcomes.
//!
//! Features:
//! - Next-5 projection from the live session at the observed win rate
//! - Strategy comparison (fixed / percentage / Masaniello) with ruin risk
//! - Seeded randomness and cancellation between trials

use std::fmt;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Result, TradeGuardError};
use crate::models::{Configuration, MarketSentiment, SessionState, StrategyKind};

/// Projection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Trials for the next-trades projection
    pub projection_trials: usize,

    /// Trades simulated per projection trial
    pub projection_horizon: usize,

    /// Trials per strategy in the comparison
    pub comparison_trials: usize,

    /// Profit probability (percent) above which to continue
    pub continue_threshold_pct: u32,

    /// Ruin risk (percent) under which a strategy counts as safe
    pub max_ruin_risk_pct: f64,

    /// Bounds for the sentiment-adjusted win probability
    pub min_win_probability: f64,
    pub max_win_probability: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            projection_trials: 1000,
            projection_horizon: 5,
            comparison_trials: 500,
            continue_threshold_pct: 55,
            max_ruin_risk_pct: 5.0,
            min_win_probability: 0.10,
            max_win_probability: 0.90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Continue,
    Stop,
}

/// Outcome of the next-trades projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Percent of trials ending above the starting balance (0-100)
    pub probability_of_profit: u32,

    /// Mean ending balance across trials
    pub projected_balance: Decimal,

    pub recommendation: Recommendation,

    /// Win probability used after sentiment adjustment
    pub win_probability: f64,
}

/// Inputs for the strategy comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonParams {
    pub start_balance: Decimal,
    pub trade_count: u32,

    /// Estimated win rate in percent (55 = 55%)
    pub estimated_win_rate: f64,

    /// Payout multiplier (0.85 for 85%)
    pub payout: f64,
}

impl ComparisonParams {
    /// 100 trades at 55% from the configured bankroll and payout.
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            start_balance: config.initial_balance,
            trade_count: 100,
            estimated_win_rate: 55.0,
            payout: config.payout_multiplier().to_f64().unwrap_or(0.85),
        }
    }
}

/// Per-strategy comparison outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparisonResult {
    pub strategy: StrategyKind,
    pub name: String,

    /// Mean ending balance across trials
    pub average_balance: Decimal,

    /// Percent of trials ending above the start balance
    pub profit_probability: f64,

    /// Percent of trials that hit zero before the horizon ended
    pub ruin_probability: f64,

    /// Exactly one result carries the recommendation
    pub recommended: bool,
}

impl fmt::Display for StrategyComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<22} avg ${:>10.2}  profit {:>5.1}%  ruin {:>5.1}%{}",
            self.name,
            self.average_balance,
            self.profit_probability,
            self.ruin_probability,
            if self.recommended { "  <- recommended" } else { "" }
        )
    }
}

/// Stake rule for one comparison candidate.
#[derive(Debug, Clone, Copy)]
enum Candidate {
    /// Constant fraction of the starting balance
    Fixed { fraction: f64 },
    /// Fraction of the running balance
    Percentage { fraction: f64 },
    /// Target wins over the full sequence
    Masaniello { target_wins: u32 },
}

impl Candidate {
    fn kind(&self) -> StrategyKind {
        match self {
            Candidate::Fixed { .. } => StrategyKind::Fixed,
            Candidate::Percentage { .. } => StrategyKind::Percentage,
            Candidate::Masaniello { .. } => StrategyKind::Masaniello,
        }
    }

    fn name(&self) -> String {
        match self {
            Candidate::Fixed { fraction } => format!("Fixed Amount ({:.0}%)", fraction * 100.0),
            Candidate::Percentage { fraction } => format!("Percentage ({:.0}%)", fraction * 100.0),
            Candidate::Masaniello { target_wins } => format!("Masaniello ({} wins)", target_wins),
        }
    }
}

/// Monte-Carlo engine. Stateless apart from its parameters and cancel token.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    config: ProjectionConfig,
    cancel: CancellationToken,
}

impl Default for ProjectionEngine {
    fn default() -> Self {
        Self::new(ProjectionConfig::default())
    }
}

impl ProjectionEngine {
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts an in-flight run between trials.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    fn check_cancelled(&self, completed: usize) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TradeGuardError::ProjectionCancelled { completed });
        }
        Ok(())
    }

    /// Sentiment-adjusted win probability from the observed win rate.
    pub fn adjusted_win_probability(&self, session: &SessionState, sentiment: MarketSentiment) -> f64 {
        let base = session.win_rate().unwrap_or(0.5);
        (base + sentiment.win_probability_offset())
            .clamp(self.config.min_win_probability, self.config.max_win_probability)
    }

    /// Project the next few trades from the current balance.
    ///
    /// Each step stakes `balance * risk_percentage / 100` of the simulated
    /// balance; a win pays `stake * payout`, a loss costs the stake.
    pub fn project_next5<R: Rng>(
        &self,
        session: &SessionState,
        config: &Configuration,
        sentiment: MarketSentiment,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let trials = self.config.projection_trials.max(1);
        let win_probability = self.adjusted_win_probability(session, sentiment);
        let start = session.current_balance_f64();
        let risk = config.risk_percentage.to_f64().unwrap_or(0.0) / 100.0;
        let payout = config.payout_multiplier().to_f64().unwrap_or(0.0);

        let mut profitable = 0usize;
        let mut total_ending = 0.0f64;

        for trial in 0..trials {
            self.check_cancelled(trial)?;

            let mut balance = start;
            for _ in 0..self.config.projection_horizon {
                let stake = balance * risk;
                if rng.gen::<f64>() < win_probability {
                    balance += stake * payout;
                } else {
                    balance -= stake;
                }
            }

            if balance > start {
                profitable += 1;
            }
            total_ending += balance;
        }

        let probability = ((profitable as f64 / trials as f64) * 100.0).round() as u32;
        let average = total_ending / trials as f64;
        let recommendation = if probability > self.config.continue_threshold_pct {
            Recommendation::Continue
        } else {
            Recommendation::Stop
        };

        info!(
            trials = trials,
            win_probability = win_probability,
            sentiment = %sentiment,
            probability = probability,
            projected = average,
            "Next-trades projection complete"
        );

        Ok(SimulationResult {
            probability_of_profit: probability,
            projected_balance: to_money(average),
            recommendation,
            win_probability,
        })
    }

    /// Compare fixed, percentage and Masaniello sizing over a full sequence.
    ///
    /// The recommended strategy is the highest average ending balance among
    /// those with ruin risk under the threshold, else the lowest ruin risk.
    pub fn compare_strategies<R: Rng>(
        &self,
        params: &ComparisonParams,
        rng: &mut R,
    ) -> Result<Vec<StrategyComparisonResult>> {
        let target_wins = (params.trade_count as f64 * params.estimated_win_rate / 100.0)
            .floor()
            .max(0.0) as u32;
        let candidates = [
            Candidate::Fixed { fraction: 0.01 },
            Candidate::Percentage { fraction: 0.03 },
            Candidate::Masaniello { target_wins },
        ];

        let mut completed = 0usize;
        let mut results = Vec::with_capacity(candidates.len());
        let mut averages = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let (result, average) = self.run_candidate(candidate, params, rng, &mut completed)?;
            results.push(result);
            averages.push(average);
        }

        // Ranked on the raw means; the Decimal averages saturate
        let safe_best = results
            .iter()
            .zip(&averages)
            .enumerate()
            .filter(|(_, (r, _))| r.ruin_probability < self.config.max_ruin_risk_pct)
            .fold(None::<(usize, f64)>, |best, (i, (_, &avg))| match best {
                Some((_, b)) if b.total_cmp(&avg).is_ge() => best,
                _ => Some((i, avg)),
            })
            .map(|(i, _)| i);

        let pick = safe_best.or_else(|| {
            results
                .iter()
                .enumerate()
                .fold(None::<(usize, &StrategyComparisonResult)>, |best, (i, r)| match best {
                    Some((_, b)) if b.ruin_probability <= r.ruin_probability => best,
                    _ => Some((i, r)),
                })
                .map(|(i, _)| i)
        });

        if let Some(i) = pick {
            results[i].recommended = true;
            info!(
                strategy = %results[i].strategy,
                average = %results[i].average_balance,
                ruin = results[i].ruin_probability,
                "Strategy comparison complete"
            );
        }

        Ok(results)
    }

    fn run_candidate<R: Rng>(
        &self,
        candidate: Candidate,
        params: &ComparisonParams,
        rng: &mut R,
        completed: &mut usize,
    ) -> Result<(StrategyComparisonResult, f64)> {
        let trials = self.config.comparison_trials.max(1);
        let start = params.start_balance.to_f64().unwrap_or(0.0);
        let win_probability = (params.estimated_win_rate / 100.0).clamp(0.0, 1.0);
        let trade_count = params.trade_count as usize;

        let mut total_ending = 0.0f64;
        let mut bankruptcies = 0usize;
        let mut profitable = 0usize;

        for _ in 0..trials {
            self.check_cancelled(*completed)?;

            let mut balance = start;
            let mut remaining_wins = match candidate {
                Candidate::Masaniello { target_wins } => target_wins as i64,
                _ => 0,
            };
            let mut bankrupt = trade_count > 0 && balance <= 0.0;

            if !bankrupt {
                for step in 0..trade_count {
                    let raw = match candidate {
                        Candidate::Fixed { fraction } => start * fraction,
                        Candidate::Percentage { fraction } => balance * fraction,
                        Candidate::Masaniello { .. } => {
                            let remaining_trades = (trade_count - step) as i64;
                            if remaining_wins > 0 {
                                balance * remaining_wins as f64 / remaining_trades as f64
                            } else {
                                0.0
                            }
                        }
                    };
                    let stake = raw.min(balance).max(0.0);

                    if rng.gen::<f64>() < win_probability {
                        balance += stake * params.payout;
                        remaining_wins -= 1;
                    } else {
                        balance -= stake;
                    }

                    if balance <= 0.0 {
                        bankrupt = true;
                        break;
                    }
                }
            }

            if bankrupt {
                bankruptcies += 1;
            }
            if balance > start {
                profitable += 1;
            }
            total_ending += balance;
            *completed += 1;
        }

        let average = total_ending / trials as f64;
        let result = StrategyComparisonResult {
            strategy: candidate.kind(),
            name: candidate.name(),
            average_balance: to_money(average),
            profit_probability: profitable as f64 / trials as f64 * 100.0,
            ruin_probability: bankruptcies as f64 / trials as f64 * 100.0,
            recommended: false,
        };
        Ok((result, average))
    }
}

/// Round to cents, saturating at the Decimal range.
fn to_money(value: f64) -> Decimal {
    match Decimal::try_from(value) {
        Ok(amount) => amount.round_dp(2),
        Err(_) if value.is_nan() => Decimal::ZERO,
        Err(_) if value > 0.0 => Decimal::MAX,
        Err(_) => Decimal::MIN,
    }
}
