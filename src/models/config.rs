//! Bankroll configuration: strategy choice, sizing parameters and risk limits.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TradeGuardError;

/// Stake sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyKind {
    /// Constant amount per trade
    Fixed,
    /// Percentage of the current balance
    Percentage,
    /// Fraction of remaining trades that must be wins
    Masaniello,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Fixed => "FIXED",
            StrategyKind::Percentage => "PERCENTAGE",
            StrategyKind::Masaniello => "MASANIELLO",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = TradeGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "percentage" | "percent" => Ok(Self::Percentage),
            "masaniello" | "masa" => Ok(Self::Masaniello),
            other => Err(TradeGuardError::invalid_config(
                "strategy",
                format!("unknown strategy `{other}`"),
            )),
        }
    }
}

/// Scales every computed stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn multiplier(&self) -> Decimal {
        match self {
            RiskTolerance::Low => dec!(0.8),
            RiskTolerance::Medium => dec!(1.0),
            RiskTolerance::High => dec!(1.2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "LOW",
            RiskTolerance::Medium => "MEDIUM",
            RiskTolerance::High => "HIGH",
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = TradeGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TradeGuardError::invalid_config(
                "risk_tolerance",
                format!("unknown risk tolerance `{other}`"),
            )),
        }
    }
}

/// Session configuration snapshot.
///
/// Treated as immutable by the core: every update produces a new value.
/// A risk limit of zero means the limit is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    // === Bankroll ===
    /// Balance at session start
    pub initial_balance: Decimal,

    /// Broker payout on a win, in percent (85 = 85%)
    pub payout_percentage: Decimal,

    /// Enables the autopilot advisory rules
    pub autopilot: bool,

    // === Strategy ===
    pub strategy: StrategyKind,

    /// Stake for the FIXED strategy
    pub fixed_amount: Decimal,

    /// Percent of balance for the PERCENTAGE strategy
    pub risk_percentage: Decimal,

    /// Masaniello: number of events in the cycle
    pub total_events: u32,

    /// Masaniello: wins needed within the cycle
    pub target_wins: u32,

    pub risk_tolerance: RiskTolerance,

    // === Risk Limits ===
    /// Lock after this many losses in total
    pub max_losses_allowed: u32,

    /// Lock when drawdown from peak reaches this percent
    pub max_drawdown_pct: Decimal,

    /// Lock when session profit reaches this amount
    pub session_take_profit: Decimal,

    /// Lock when session loss reaches this amount
    pub session_stop_loss: Decimal,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            initial_balance: dec!(100),
            payout_percentage: dec!(85),
            autopilot: false,
            strategy: StrategyKind::Masaniello,
            fixed_amount: dec!(1),
            risk_percentage: dec!(5),
            total_events: 20,
            target_wins: 12,
            risk_tolerance: RiskTolerance::Medium,
            max_losses_allowed: 0,
            max_drawdown_pct: Decimal::ZERO,
            session_take_profit: Decimal::ZERO,
            session_stop_loss: Decimal::ZERO,
        }
    }
}

/// Keys accepted by [`ConfigUpdate::from_assignments`] and the environment loader.
pub const CONFIG_KEYS: &[&str] = &[
    "initial_balance",
    "payout_percentage",
    "autopilot",
    "strategy",
    "fixed_amount",
    "risk_percentage",
    "total_events",
    "target_wins",
    "risk_tolerance",
    "max_losses_allowed",
    "max_drawdown_pct",
    "session_take_profit",
    "session_stop_loss",
];

const ENV_PREFIX: &str = "TRADEGUARD_";

impl Configuration {
    /// Payout as a multiplier of the stake (0.85 for 85%).
    pub fn payout_multiplier(&self) -> Decimal {
        self.payout_percentage / dec!(100)
    }

    /// Load defaults overridden by `TRADEGUARD_<KEY>` environment variables.
    ///
    /// Reads a `.env` file if present. Bad values are recovered and returned.
    pub fn from_env() -> (Self, Vec<TradeGuardError>) {
        dotenvy::dotenv().ok();

        let assignments: Vec<String> = CONFIG_KEYS
            .iter()
            .filter_map(|key| {
                let var = format!("{}{}", ENV_PREFIX, key.to_uppercase());
                std::env::var(var).ok().map(|value| format!("{key}={value}"))
            })
            .collect();

        let (update, mut errors) = ConfigUpdate::from_assignments(&assignments);
        let (config, apply_errors) = Self::default().apply(&update);
        errors.extend(apply_errors);
        (config, errors)
    }

    /// Produce a new snapshot with the update applied and values sanitized.
    ///
    /// Out-of-range values are replaced with the nearest valid value and
    /// reported as [`TradeGuardError::InvalidConfiguration`].
    pub fn apply(&self, update: &ConfigUpdate) -> (Self, Vec<TradeGuardError>) {
        let mut next = self.clone();

        if let Some(v) = update.initial_balance {
            next.initial_balance = v;
        }
        if let Some(v) = update.payout_percentage {
            next.payout_percentage = v;
        }
        if let Some(v) = update.autopilot {
            next.autopilot = v;
        }
        if let Some(v) = update.strategy {
            next.strategy = v;
        }
        if let Some(v) = update.fixed_amount {
            next.fixed_amount = v;
        }
        if let Some(v) = update.risk_percentage {
            next.risk_percentage = v;
        }
        if let Some(v) = update.total_events {
            next.total_events = v;
        }
        if let Some(v) = update.target_wins {
            next.target_wins = v;
        }
        if let Some(v) = update.risk_tolerance {
            next.risk_tolerance = v;
        }
        if let Some(v) = update.max_losses_allowed {
            next.max_losses_allowed = v;
        }
        if let Some(v) = update.max_drawdown_pct {
            next.max_drawdown_pct = v;
        }
        if let Some(v) = update.session_take_profit {
            next.session_take_profit = v;
        }
        if let Some(v) = update.session_stop_loss {
            next.session_stop_loss = v;
        }

        let errors = next.sanitize();
        (next, errors)
    }

    fn sanitize(&mut self) -> Vec<TradeGuardError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("initial_balance", &mut self.initial_balance),
            ("payout_percentage", &mut self.payout_percentage),
            ("fixed_amount", &mut self.fixed_amount),
            ("risk_percentage", &mut self.risk_percentage),
            ("max_drawdown_pct", &mut self.max_drawdown_pct),
            ("session_take_profit", &mut self.session_take_profit),
            ("session_stop_loss", &mut self.session_stop_loss),
        ] {
            if *value < Decimal::ZERO {
                errors.push(TradeGuardError::invalid_config(
                    field,
                    format!("{value} is negative, using 0"),
                ));
                *value = Decimal::ZERO;
            }
        }

        for (field, value) in [
            ("risk_percentage", &mut self.risk_percentage),
            ("max_drawdown_pct", &mut self.max_drawdown_pct),
        ] {
            if *value > dec!(100) {
                errors.push(TradeGuardError::invalid_config(
                    field,
                    format!("{value}% exceeds 100%, using 100"),
                ));
                *value = dec!(100);
            }
        }

        if self.target_wins > self.total_events {
            errors.push(TradeGuardError::invalid_config(
                "target_wins",
                format!(
                    "{} exceeds total_events {}, capping",
                    self.target_wins, self.total_events
                ),
            ));
            self.target_wins = self.total_events;
        }

        for err in &errors {
            warn!(error = %err, "Recovered configuration value");
        }

        errors
    }
}

/// Partial configuration change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub initial_balance: Option<Decimal>,
    pub payout_percentage: Option<Decimal>,
    pub autopilot: Option<bool>,
    pub strategy: Option<StrategyKind>,
    pub fixed_amount: Option<Decimal>,
    pub risk_percentage: Option<Decimal>,
    pub total_events: Option<u32>,
    pub target_wins: Option<u32>,
    pub risk_tolerance: Option<RiskTolerance>,
    pub max_losses_allowed: Option<u32>,
    pub max_drawdown_pct: Option<Decimal>,
    pub session_take_profit: Option<Decimal>,
    pub session_stop_loss: Option<Decimal>,
}

impl ConfigUpdate {
    /// Parse `key=value` assignments.
    ///
    /// Non-numeric values for numeric keys become zero; unknown strategy or
    /// tolerance names leave the field unset. Every problem is reported.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> (Self, Vec<TradeGuardError>) {
        let mut update = Self::default();
        let mut errors = Vec::new();

        for raw in assignments {
            let raw = raw.as_ref();
            let Some((key, value)) = raw.split_once('=') else {
                errors.push(TradeGuardError::invalid_config(
                    raw.trim(),
                    "expected key=value",
                ));
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "initial_balance" => update.initial_balance = Some(decimal_or_zero(&key, value, &mut errors)),
                "payout_percentage" => update.payout_percentage = Some(decimal_or_zero(&key, value, &mut errors)),
                "fixed_amount" => update.fixed_amount = Some(decimal_or_zero(&key, value, &mut errors)),
                "risk_percentage" => update.risk_percentage = Some(decimal_or_zero(&key, value, &mut errors)),
                "max_drawdown_pct" => update.max_drawdown_pct = Some(decimal_or_zero(&key, value, &mut errors)),
                "session_take_profit" => update.session_take_profit = Some(decimal_or_zero(&key, value, &mut errors)),
                "session_stop_loss" => update.session_stop_loss = Some(decimal_or_zero(&key, value, &mut errors)),
                "total_events" => update.total_events = Some(count_or_zero(&key, value, &mut errors)),
                "target_wins" => update.target_wins = Some(count_or_zero(&key, value, &mut errors)),
                "max_losses_allowed" => update.max_losses_allowed = Some(count_or_zero(&key, value, &mut errors)),
                "autopilot" => match value.to_lowercase().as_str() {
                    "true" | "on" | "1" | "yes" => update.autopilot = Some(true),
                    "false" | "off" | "0" | "no" => update.autopilot = Some(false),
                    _ => errors.push(TradeGuardError::invalid_config(
                        &key,
                        format!("`{value}` is not a boolean"),
                    )),
                },
                "strategy" => match value.parse() {
                    Ok(s) => update.strategy = Some(s),
                    Err(e) => errors.push(e),
                },
                "risk_tolerance" => match value.parse() {
                    Ok(t) => update.risk_tolerance = Some(t),
                    Err(e) => errors.push(e),
                },
                _ => errors.push(TradeGuardError::invalid_config(&key, "unknown setting")),
            }
        }

        (update, errors)
    }
}

fn decimal_or_zero(field: &str, value: &str, errors: &mut Vec<TradeGuardError>) -> Decimal {
    value.parse::<Decimal>().unwrap_or_else(|_| {
        errors.push(TradeGuardError::invalid_config(
            field,
            format!("`{value}` is not a number, using 0"),
        ));
        Decimal::ZERO
    })
}

fn count_or_zero(field: &str, value: &str, errors: &mut Vec<TradeGuardError>) -> u32 {
    value.parse::<u32>().unwrap_or_else(|_| {
        errors.push(TradeGuardError::invalid_config(
            field,
            format!("`{value}` is not a whole number, using 0"),
        ));
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.strategy, StrategyKind::Masaniello);
        assert_eq!(config.payout_multiplier(), dec!(0.85));
        assert_eq!(config.max_losses_allowed, 0);
    }

    #[test]
    fn test_apply_returns_new_snapshot() {
        let config = Configuration::default();
        let update = ConfigUpdate {
            strategy: Some(StrategyKind::Fixed),
            fixed_amount: Some(dec!(10)),
            ..Default::default()
        };

        let (next, errors) = config.apply(&update);
        assert!(errors.is_empty());
        assert_eq!(next.strategy, StrategyKind::Fixed);
        assert_eq!(next.fixed_amount, dec!(10));
        // Previous snapshot untouched
        assert_eq!(config.strategy, StrategyKind::Masaniello);
    }

    #[test]
    fn test_non_numeric_becomes_zero() {
        let (update, errors) =
            ConfigUpdate::from_assignments(&["fixed_amount=abc", "total_events=20"]);
        assert_eq!(update.fixed_amount, Some(Decimal::ZERO));
        assert_eq!(update.total_events, Some(20));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            TradeGuardError::InvalidConfiguration { field, .. } if field == "fixed_amount"
        ));
    }

    #[test]
    fn test_unknown_enum_leaves_field_unset() {
        let (update, errors) =
            ConfigUpdate::from_assignments(&["strategy=martingale", "risk_tolerance=high"]);
        assert_eq!(update.strategy, None);
        assert_eq!(update.risk_tolerance, Some(RiskTolerance::High));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_out_of_range_is_recovered() {
        let update = ConfigUpdate {
            risk_percentage: Some(dec!(150)),
            session_stop_loss: Some(dec!(-20)),
            total_events: Some(10),
            target_wins: Some(15),
            ..Default::default()
        };
        let (next, errors) = Configuration::default().apply(&update);

        assert_eq!(next.risk_percentage, dec!(100));
        assert_eq!(next.session_stop_loss, Decimal::ZERO);
        assert_eq!(next.target_wins, 10);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_malformed_assignment() {
        let (update, errors) = ConfigUpdate::from_assignments(&["autopilot", "autopilot=on"]);
        assert_eq!(update.autopilot, Some(true));
        assert_eq!(errors.len(), 1);
    }
}
