//! Append-only trade ledger with derived balance, peak and drawdown.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Result, TradeGuardError};
use crate::models::{Outcome, SessionState, Trade};

/// Record of executed trades for one session.
#[derive(Debug, Clone)]
pub struct Ledger {
    trades: Vec<Trade>,
    state: SessionState,
}

impl Ledger {
    /// Create an empty ledger starting at `initial_balance`.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            trades: Vec::new(),
            state: SessionState::new(initial_balance),
        }
    }

    /// Record a resolved event.
    ///
    /// WIN adds `stake * payout_multiplier`, LOSS subtracts `stake`.
    pub fn append(
        &mut self,
        outcome: Outcome,
        stake: Decimal,
        payout_multiplier: Decimal,
    ) -> Result<Trade> {
        if stake < Decimal::ZERO {
            return Err(TradeGuardError::InvalidStake(stake));
        }

        let profit_or_loss = Trade::settle(outcome, stake, payout_multiplier);
        let balance_after = self.state.current_balance + profit_or_loss;

        let trade = Trade {
            sequence: self.trades.len() as u32 + 1,
            stake,
            outcome,
            payout_multiplier,
            profit_or_loss,
            balance_after,
            created_at: Utc::now(),
        };

        let state = &mut self.state;
        state.current_balance = balance_after;
        if balance_after > state.peak_balance {
            state.peak_balance = balance_after;
        }
        state.current_drawdown = SessionState::drawdown_pct(state.peak_balance, balance_after);
        match outcome {
            Outcome::Win => state.total_wins += 1,
            Outcome::Loss => state.total_losses += 1,
        }

        debug!(
            sequence = trade.sequence,
            outcome = trade.outcome.as_str(),
            stake = %stake,
            balance = %balance_after,
            "Ledger entry"
        );

        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Drop every trade and restart from `initial_balance`.
    pub fn reset(&mut self, initial_balance: Decimal) {
        self.trades.clear();
        self.state = SessionState::new(initial_balance);
    }

    /// Current derived statistics.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// The most recent `n` trades, oldest first.
    pub fn last_n(&self, n: usize) -> &[Trade] {
        let start = self.trades.len().saturating_sub(n);
        &self.trades[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assert_invariants(ledger: &Ledger) {
        let state = ledger.snapshot();
        let total: Decimal = ledger.trades().iter().map(|t| t.profit_or_loss).sum();
        assert_eq!(state.current_balance, state.initial_balance + total);
        assert!(state.peak_balance >= state.current_balance);
    }

    #[test]
    fn test_fixed_stake_scenario() {
        let mut ledger = Ledger::new(dec!(100));
        let payout = dec!(0.85);

        let t1 = ledger.append(Outcome::Win, dec!(10), payout).unwrap();
        let t2 = ledger.append(Outcome::Loss, dec!(10), payout).unwrap();
        let t3 = ledger.append(Outcome::Win, dec!(10), payout).unwrap();

        assert_eq!(t1.balance_after.round_dp(2), dec!(108.5));
        assert_eq!(t2.balance_after.round_dp(2), dec!(98.5));
        assert_eq!(t3.balance_after.round_dp(2), dec!(107.0));
        assert_eq!((t1.sequence, t2.sequence, t3.sequence), (1, 2, 3));

        let state = ledger.snapshot();
        assert_eq!(state.total_wins, 2);
        assert_eq!(state.total_losses, 1);
        assert_eq!(state.roi_pct().round(), dec!(7));
        assert_eq!(state.peak_balance, dec!(108.5));
        assert_invariants(&ledger);
    }

    #[test]
    fn test_negative_stake_rejected() {
        let mut ledger = Ledger::new(dec!(100));
        let err = ledger.append(Outcome::Loss, dec!(-1), dec!(0.85)).unwrap_err();
        assert_eq!(err, TradeGuardError::InvalidStake(dec!(-1)));
        assert!(ledger.is_empty());
        assert_eq!(ledger.snapshot().current_balance, dec!(100));
    }

    #[test]
    fn test_peak_never_decreases() {
        let mut ledger = Ledger::new(dec!(100));
        let mut last_peak = dec!(100);
        let sequence = [
            (Outcome::Win, dec!(50)),
            (Outcome::Loss, dec!(80)),
            (Outcome::Win, dec!(20)),
            (Outcome::Loss, dec!(5)),
            (Outcome::Win, dec!(100)),
        ];

        for (outcome, stake) in sequence {
            ledger.append(outcome, stake, dec!(0.9)).unwrap();
            let state = ledger.snapshot();
            assert!(state.peak_balance >= last_peak);
            last_peak = state.peak_balance;
            assert_invariants(&ledger);
        }
    }

    #[test]
    fn test_drawdown_percent() {
        let mut ledger = Ledger::new(dec!(100));
        ledger.append(Outcome::Win, dec!(100), dec!(1)).unwrap(); // 200
        ledger.append(Outcome::Loss, dec!(50), dec!(1)).unwrap(); // 150
        assert_eq!(ledger.snapshot().current_drawdown, dec!(25));
    }

    #[test]
    fn test_reset() {
        let mut ledger = Ledger::new(dec!(100));
        ledger.append(Outcome::Loss, dec!(10), dec!(0.85)).unwrap();
        ledger.reset(dec!(250));

        assert!(ledger.is_empty());
        let state = ledger.snapshot();
        assert_eq!(state, SessionState::new(dec!(250)));

        // Sequence numbering restarts with the new session
        let t = ledger.append(Outcome::Win, dec!(10), dec!(0.85)).unwrap();
        assert_eq!(t.sequence, 1);
    }

    #[test]
    fn test_last_n() {
        let mut ledger = Ledger::new(dec!(100));
        for _ in 0..3 {
            ledger.append(Outcome::Win, dec!(1), dec!(0.85)).unwrap();
        }
        assert_eq!(ledger.last_n(5).len(), 3);
        assert_eq!(ledger.last_n(2)[0].sequence, 2);
    }
}
