//! Session risk limits and the resulting trading lock.
//!
//! Four independent conditions, each enabled only when its threshold is
//! nonzero:
//! - drawdown from peak reaches the configured percent
//! - total losses reach the configured count
//! - session profit reaches the take-profit amount
//! - session loss reaches the stop-loss amount

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Configuration, SessionState};

/// Which limit tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockReason {
    DrawdownLimit,
    MaxLosses,
    TakeProfit,
    StopLoss,
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LockReason::DrawdownLimit => "max drawdown limit reached",
            LockReason::MaxLosses => "max losses limit reached",
            LockReason::TakeProfit => "session take-profit achieved",
            LockReason::StopLoss => "session stop-loss reached",
        };
        f.write_str(text)
    }
}

/// Lock decision with every tripped reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub locked: bool,
    pub reasons: BTreeSet<LockReason>,
}

impl LockState {
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Keep an existing lock engaged and add any newly tripped reasons.
    pub fn latch(&mut self, next: LockState) {
        self.reasons.extend(next.reasons);
        self.locked = self.locked || next.locked;
    }
}

/// Evaluator for session risk limits.
pub struct SafetyGate;

impl SafetyGate {
    /// Evaluate every enabled limit against the session.
    pub fn evaluate(session: &SessionState, config: &Configuration) -> LockState {
        let mut reasons = BTreeSet::new();
        let net = session.current_balance - config.initial_balance;

        if config.max_drawdown_pct > Decimal::ZERO
            && session.current_drawdown >= config.max_drawdown_pct
        {
            reasons.insert(LockReason::DrawdownLimit);
        }

        if config.max_losses_allowed > 0 && session.total_losses >= config.max_losses_allowed {
            reasons.insert(LockReason::MaxLosses);
        }

        if config.session_take_profit > Decimal::ZERO && net >= config.session_take_profit {
            reasons.insert(LockReason::TakeProfit);
        }

        if config.session_stop_loss > Decimal::ZERO && net <= -config.session_stop_loss {
            reasons.insert(LockReason::StopLoss);
        }

        if !reasons.is_empty() {
            debug!(
                reasons = ?reasons,
                drawdown = %session.current_drawdown,
                net = %net,
                losses = session.total_losses,
                "Safety limits tripped"
            );
        }

        LockState {
            locked: !reasons.is_empty(),
            reasons,
        }
    }
}
