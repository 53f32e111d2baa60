//! Trade model: one resolved binary event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of a binary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }

    /// Parse a single-character or full-word outcome (`W`, `win`, `L`, `loss`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "w" | "win" => Some(Outcome::Win),
            "l" | "loss" | "lose" => Some(Outcome::Loss),
            _ => None,
        }
    }
}

/// Immutable record of an executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 1-based sequence number, assigned by the ledger
    pub sequence: u32,

    /// Amount committed to the event
    pub stake: Decimal,

    pub outcome: Outcome,

    /// Fraction of the stake paid out as profit on a win (0.85 for 85%)
    pub payout_multiplier: Decimal,

    /// Signed profit (+) or loss (-)
    pub profit_or_loss: Decimal,

    /// Ledger balance immediately after this trade
    pub balance_after: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.outcome.is_win()
    }

    /// Signed P&L for a stake resolved with the given outcome.
    pub fn settle(outcome: Outcome, stake: Decimal, payout_multiplier: Decimal) -> Decimal {
        match outcome {
            Outcome::Win => stake * payout_multiplier,
            Outcome::Loss => -stake,
        }
    }
}
