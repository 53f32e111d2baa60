//! Session performance statistics.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Performance summary over one session's trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    // === Basic Statistics ===
    pub total_trades: u32,

    /// Sum of all stakes
    pub total_staked: Decimal,

    /// Net P&L across the session
    pub net_profit: Decimal,

    /// Net profit relative to the starting balance, in percent
    pub roi_pct: Decimal,

    // === Win/Loss Metrics ===
    pub winning_trades: u32,
    pub losing_trades: u32,

    /// Win rate (0.0 to 1.0)
    pub win_rate: f64,

    /// Average profit on winning trades
    pub avg_win: Decimal,

    /// Average loss on losing trades (absolute value)
    pub avg_loss: Decimal,

    /// Gross profit / gross loss; 0 when nothing was lost
    pub profit_factor: f64,

    /// Mean P&L per trade
    pub expectancy: Decimal,

    // === Risk Metrics ===
    /// Largest decline from a running peak (0.0 to 1.0)
    pub max_drawdown: f64,

    /// Largest decline from a running peak in money
    pub max_drawdown_amount: Decimal,

    /// Longest run of consecutive losses
    pub longest_loss_streak: u32,

    /// Mean / std-dev of per-trade returns
    pub sharpe_ratio: f64,

    /// Mean / downside deviation of per-trade returns
    pub sortino_ratio: f64,
}

impl fmt::Display for SessionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Metrics ===")?;
        writeln!(
            f,
            "Trades:         {} ({}W / {}L, {:.1}% win rate)",
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.win_rate * 100.0
        )?;
        writeln!(f, "Net profit:     ${:.2} ({:.2}% ROI)", self.net_profit, self.roi_pct)?;
        writeln!(f, "Total staked:   ${:.2}", self.total_staked)?;
        writeln!(f, "Avg win/loss:   ${:.2} / ${:.2}", self.avg_win, self.avg_loss)?;
        writeln!(f, "Profit factor:  {:.2}", self.profit_factor)?;
        writeln!(f, "Expectancy:     ${:.2}", self.expectancy)?;
        writeln!(
            f,
            "Max drawdown:   {:.1}% (${:.2})",
            self.max_drawdown * 100.0,
            self.max_drawdown_amount
        )?;
        writeln!(f, "Loss streak:    {}", self.longest_loss_streak)?;
        write!(
            f,
            "Sharpe/Sortino: {:.2} / {:.2}",
            self.sharpe_ratio, self.sortino_ratio
        )
    }
}
