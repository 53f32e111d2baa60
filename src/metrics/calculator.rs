//! Calculator for session performance metrics: drawdown, Sharpe ratio, win rate, etc.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use statrs::statistics::Statistics;

use crate::models::{SessionMetrics, Trade};

/// Calculator for computing session performance metrics.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate metrics from the ledger's trades and the starting balance.
    pub fn calculate(trades: &[Trade], initial_balance: Decimal) -> SessionMetrics {
        let mut metrics = SessionMetrics::default();

        if trades.is_empty() {
            return metrics;
        }

        metrics.total_trades = trades.len() as u32;
        metrics.total_staked = trades.iter().map(|t| t.stake).sum();

        let pnls: Vec<Decimal> = trades.iter().map(|t| t.profit_or_loss).collect();
        Self::calculate_pnl_metrics(&mut metrics, trades, &pnls);

        if initial_balance > Decimal::ZERO {
            metrics.roi_pct = (metrics.net_profit / initial_balance * dec!(100)).round_dp(2);
        }

        Self::calculate_drawdown(&mut metrics, trades, initial_balance);
        Self::calculate_streaks(&mut metrics, trades);
        Self::calculate_sharpe_sortino(&mut metrics, trades);

        metrics
    }

    /// Win/loss counts, averages, profit factor and expectancy.
    fn calculate_pnl_metrics(metrics: &mut SessionMetrics, trades: &[Trade], pnls: &[Decimal]) {
        let (wins, losses): (Vec<&Trade>, Vec<&Trade>) = trades.iter().partition(|t| t.is_win());

        metrics.winning_trades = wins.len() as u32;
        metrics.losing_trades = losses.len() as u32;
        metrics.net_profit = pnls.iter().copied().sum();
        metrics.win_rate = wins.len() as f64 / trades.len() as f64;

        let gross_profit: Decimal = wins.iter().map(|t| t.profit_or_loss).sum();
        let gross_loss: Decimal = losses.iter().map(|t| t.profit_or_loss.abs()).sum();

        if !wins.is_empty() {
            metrics.avg_win = gross_profit / Decimal::from(wins.len() as u32);
        }
        if !losses.is_empty() {
            metrics.avg_loss = gross_loss / Decimal::from(losses.len() as u32);
        }

        if gross_loss > Decimal::ZERO {
            metrics.profit_factor =
                gross_profit.to_f64().unwrap_or(0.0) / gross_loss.to_f64().unwrap_or(1.0);
        }

        metrics.expectancy = metrics.net_profit / Decimal::from(pnls.len() as u32);
    }

    /// Max drawdown along the balance path, starting from the initial balance.
    fn calculate_drawdown(metrics: &mut SessionMetrics, trades: &[Trade], initial_balance: Decimal) {
        let mut peak = initial_balance;
        let mut max_dd = Decimal::ZERO;
        let mut max_dd_pct = 0.0f64;

        for trade in trades {
            let equity = trade.balance_after;
            if equity > peak {
                peak = equity;
            }

            if peak > Decimal::ZERO {
                let dd = peak - equity;
                if dd > max_dd {
                    max_dd = dd;
                }

                let dd_pct = dd.to_f64().unwrap_or(0.0) / peak.to_f64().unwrap_or(1.0);
                if dd_pct > max_dd_pct {
                    max_dd_pct = dd_pct;
                }
            }
        }

        metrics.max_drawdown = max_dd_pct;
        metrics.max_drawdown_amount = max_dd;
    }

    fn calculate_streaks(metrics: &mut SessionMetrics, trades: &[Trade]) {
        let mut current = 0u32;
        let mut longest = 0u32;
        for trade in trades {
            if trade.is_win() {
                current = 0;
            } else {
                current += 1;
                longest = longest.max(current);
            }
        }
        metrics.longest_loss_streak = longest;
    }

    /// Per-trade Sharpe and Sortino ratios, returns measured against the
    /// balance before each trade. Not annualized.
    fn calculate_sharpe_sortino(metrics: &mut SessionMetrics, trades: &[Trade]) {
        if trades.len() < 2 {
            return;
        }

        let returns: Vec<f64> = trades
            .iter()
            .filter_map(|t| {
                let before = t.balance_after - t.profit_or_loss;
                if before > Decimal::ZERO {
                    (t.profit_or_loss / before).to_f64()
                } else {
                    None
                }
            })
            .collect();

        if returns.len() < 2 {
            return;
        }

        let mean = returns.clone().mean();
        let std_dev = returns.clone().std_dev();

        if std_dev > 0.0 {
            metrics.sharpe_ratio = mean / std_dev;
        }

        let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();

        if negative_returns.len() >= 2 {
            let downside_dev = negative_returns.std_dev();
            if downside_dev > 0.0 {
                metrics.sortino_ratio = mean / downside_dev;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::models::Outcome;

    fn ledger(steps: &[(Outcome, Decimal)]) -> Ledger {
        let mut ledger = Ledger::new(dec!(100));
        for (outcome, stake) in steps {
            ledger.append(*outcome, *stake, dec!(0.85)).unwrap();
        }
        ledger
    }

    #[test]
    fn test_empty_session() {
        let metrics = MetricsCalculator::calculate(&[], dec!(100));
        assert_eq!(metrics, SessionMetrics::default());
    }

    #[test]
    fn test_calculate_pnl_metrics() {
        let ledger = ledger(&[
            (Outcome::Win, dec!(10)),  // +8.5
            (Outcome::Loss, dec!(10)), // -10
            (Outcome::Win, dec!(10)),  // +8.5
        ]);
        let metrics = MetricsCalculator::calculate(ledger.trades(), dec!(100));

        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.net_profit, dec!(7.0));
        assert_eq!(metrics.roi_pct, dec!(7));
        assert_eq!(metrics.total_staked, dec!(30));
        assert_eq!(metrics.avg_win, dec!(8.5));
        assert_eq!(metrics.avg_loss, dec!(10));
        assert!((metrics.win_rate - 2.0 / 3.0).abs() < 0.001);
        assert!((metrics.profit_factor - 1.7).abs() < 0.001);
    }

    #[test]
    fn test_calculate_drawdown() {
        let ledger = ledger(&[
            (Outcome::Win, dec!(20)),  // 117
            (Outcome::Loss, dec!(30)), // 87, DD 30 (~25.6%)
            (Outcome::Loss, dec!(7)),  // 80, DD 37 (~31.6%)
            (Outcome::Win, dec!(40)),  // 114
        ]);
        let metrics = MetricsCalculator::calculate(ledger.trades(), dec!(100));

        assert_eq!(metrics.max_drawdown_amount, dec!(37));
        assert!(metrics.max_drawdown > 0.31 && metrics.max_drawdown < 0.32);
        assert_eq!(metrics.longest_loss_streak, 2);
    }

    #[test]
    fn test_drawdown_measured_from_initial_balance() {
        let ledger = ledger(&[(Outcome::Loss, dec!(25)), (Outcome::Win, dec!(10))]);
        let metrics = MetricsCalculator::calculate(ledger.trades(), dec!(100));
        assert_eq!(metrics.max_drawdown_amount, dec!(25));
        assert!((metrics.max_drawdown - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_sign_follows_edge() {
        let winning = ledger(&[
            (Outcome::Win, dec!(10)),
            (Outcome::Win, dec!(10)),
            (Outcome::Loss, dec!(5)),
            (Outcome::Win, dec!(10)),
        ]);
        assert!(MetricsCalculator::calculate(winning.trades(), dec!(100)).sharpe_ratio > 0.0);

        let losing = ledger(&[
            (Outcome::Loss, dec!(10)),
            (Outcome::Loss, dec!(10)),
            (Outcome::Win, dec!(5)),
            (Outcome::Loss, dec!(10)),
        ]);
        let metrics = MetricsCalculator::calculate(losing.trades(), dec!(100));
        assert!(metrics.sharpe_ratio < 0.0);
        assert!(metrics.sortino_ratio < 0.0);
    }

    #[test]
    fn test_report_display() {
        let ledger = ledger(&[(Outcome::Win, dec!(10)), (Outcome::Loss, dec!(10))]);
        let report = MetricsCalculator::calculate(ledger.trades(), dec!(100)).to_string();
        assert!(report.contains("=== Session Metrics ==="));
        assert!(report.contains("1W / 1L"));
    }
}
