//! Derived session statistics.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Snapshot of balance, peak and drawdown derived from the ledger.
///
/// Invariants: `current_balance == initial_balance + Σ profit_or_loss`,
/// `peak_balance >= current_balance`, and `peak_balance` never decreases
/// while trades are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub initial_balance: Decimal,
    pub current_balance: Decimal,

    /// Max of the initial balance and every post-trade balance
    pub peak_balance: Decimal,

    /// Decline from peak, in percent (0-100)
    pub current_drawdown: Decimal,

    pub total_wins: u32,
    pub total_losses: u32,
}

impl SessionState {
    /// Fresh state for an empty ledger.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            current_balance: initial_balance,
            peak_balance: initial_balance,
            current_drawdown: Decimal::ZERO,
            total_wins: 0,
            total_losses: 0,
        }
    }

    pub fn trades_played(&self) -> u32 {
        self.total_wins + self.total_losses
    }

    pub fn net_profit(&self) -> Decimal {
        self.current_balance - self.initial_balance
    }

    /// Return on the initial balance, in percent.
    pub fn roi_pct(&self) -> Decimal {
        if self.initial_balance.is_zero() {
            return Decimal::ZERO;
        }
        self.net_profit() / self.initial_balance * dec!(100)
    }

    /// Overall win rate (0.0 to 1.0); `None` before the first trade.
    pub fn win_rate(&self) -> Option<f64> {
        let played = self.trades_played();
        if played == 0 {
            return None;
        }
        Some(self.total_wins as f64 / played as f64)
    }

    /// Drawdown percentage for a balance measured against a peak.
    pub fn drawdown_pct(peak: Decimal, current: Decimal) -> Decimal {
        if peak <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (peak - current) / peak * dec!(100)
    }

    pub fn current_balance_f64(&self) -> f64 {
        self.current_balance.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_and_win_rate() {
        let state = SessionState {
            initial_balance: dec!(100),
            current_balance: dec!(107),
            peak_balance: dec!(108.5),
            current_drawdown: Decimal::ZERO,
            total_wins: 2,
            total_losses: 1,
        };
        assert_eq!(state.roi_pct(), dec!(7));
        assert_eq!(state.trades_played(), 3);
        assert!((state.win_rate().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_peak_drawdown() {
        assert_eq!(SessionState::drawdown_pct(Decimal::ZERO, dec!(-5)), Decimal::ZERO);
        assert_eq!(SessionState::drawdown_pct(dec!(200), dec!(150)), dec!(25));
    }

    #[test]
    fn test_empty_state() {
        let state = SessionState::new(dec!(50));
        assert_eq!(state.win_rate(), None);
        assert_eq!(state.roi_pct(), Decimal::ZERO);
        assert_eq!(state.peak_balance, dec!(50));
    }
}
