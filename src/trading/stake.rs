//! Stake sizing: fixed amount, percentage of balance, and Masaniello.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{Configuration, SessionState, StrategyKind};

/// Where a Masaniello cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasanielloStatus {
    InProgress,
    /// Target wins reached
    TargetReached,
    /// Ran out of events or bankroll before reaching the target
    Exhausted,
}

/// Remaining trades and wins in a Masaniello cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasanielloProgress {
    pub remaining_trades: i64,
    pub remaining_wins: i64,
    pub status: MasanielloStatus,
}

impl MasanielloProgress {
    pub fn is_terminal(&self) -> bool {
        self.status != MasanielloStatus::InProgress
    }
}

/// Calculator for the next stake.
pub struct StrategyEngine;

impl StrategyEngine {
    /// Compute the stake for the next trade.
    ///
    /// Always within `[0, current_balance]`; zero when `locked`.
    pub fn next_stake(session: &SessionState, config: &Configuration, locked: bool) -> Decimal {
        if locked {
            return Decimal::ZERO;
        }

        let base = match config.strategy {
            StrategyKind::Fixed => config.fixed_amount,
            StrategyKind::Percentage => Self::percentage_stake(session.current_balance, config.risk_percentage),
            StrategyKind::Masaniello => {
                let progress = Self::masaniello_progress(session, config);
                if progress.remaining_trades <= 0 || progress.remaining_wins <= 0 {
                    return Decimal::ZERO;
                }
                Self::masaniello_stake(
                    session.current_balance,
                    progress.remaining_wins,
                    progress.remaining_trades,
                )
            }
        };

        let scaled = base * config.risk_tolerance.multiplier();
        Self::clamp_to_balance(scaled, session.current_balance)
    }

    /// Remaining trades/wins of the Masaniello cycle and its status.
    ///
    /// A cycle with wins still needed but no balance left is exhausted even
    /// if events remain, since no further stake can be placed.
    pub fn masaniello_progress(session: &SessionState, config: &Configuration) -> MasanielloProgress {
        let remaining_trades = config.total_events as i64 - session.trades_played() as i64;
        let remaining_wins = config.target_wins as i64 - session.total_wins as i64;

        let status = if remaining_wins <= 0 {
            MasanielloStatus::TargetReached
        } else if remaining_trades <= 0 || session.current_balance <= Decimal::ZERO {
            MasanielloStatus::Exhausted
        } else {
            MasanielloStatus::InProgress
        };

        MasanielloProgress {
            remaining_trades,
            remaining_wins,
            status,
        }
    }

    /// `balance * risk_percentage / 100`.
    pub fn percentage_stake(balance: Decimal, risk_percentage: Decimal) -> Decimal {
        balance * risk_percentage / dec!(100)
    }

    /// `balance * remaining_wins / remaining_trades`, floored at zero.
    ///
    /// Sizing each stake to the share of remaining trades that must be wins
    /// keeps stakes flat when wins arrive on schedule and shrinks them when
    /// ahead of schedule.
    pub fn masaniello_stake(balance: Decimal, remaining_wins: i64, remaining_trades: i64) -> Decimal {
        if remaining_trades <= 0 || remaining_wins <= 0 {
            return Decimal::ZERO;
        }
        let amount = balance * Decimal::from(remaining_wins) / Decimal::from(remaining_trades);
        amount.max(Decimal::ZERO)
    }

    /// Never propose more than is available, never less than zero.
    pub fn clamp_to_balance(amount: Decimal, balance: Decimal) -> Decimal {
        amount.min(balance).max(Decimal::ZERO)
    }
}
