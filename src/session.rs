//! Bankroll session: the single owner of configuration, ledger and derived outputs.
//!
//! Every mutation runs the same recompute pass:
//! ledger snapshot -> safety gate -> next stake -> insights.
//! Projections run only on request and never touch session state.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TradeGuardError};
use crate::insights::InsightEngine;
use crate::ledger::Ledger;
use crate::metrics::MetricsCalculator;
use crate::models::{
    ConfigUpdate, Configuration, Insight, MarketSentiment, Outcome, SessionMetrics, SessionState,
    SuggestedAction, Trade,
};
use crate::projection::{ComparisonParams, ProjectionEngine, SimulationResult, StrategyComparisonResult};
use crate::trading::{LockState, MasanielloProgress, SafetyGate, StrategyEngine};

/// In-memory trading session.
pub struct Session {
    id: Uuid,
    config: Configuration,
    ledger: Ledger,
    lock: LockState,
    next_stake: Decimal,
    insights: Vec<Insight>,
    sentiment: MarketSentiment,
    projection: ProjectionEngine,
}

impl Session {
    pub fn new(config: Configuration) -> Self {
        Self::with_projection(config, ProjectionEngine::default())
    }

    /// Session using custom projection parameters.
    ///
    /// The engine serves as a template: every run gets its own cancellation
    /// token, so cancelling one run never disables later ones.
    pub fn with_projection(config: Configuration, projection: ProjectionEngine) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            ledger: Ledger::new(config.initial_balance),
            config,
            lock: LockState::unlocked(),
            next_stake: Decimal::ZERO,
            insights: Vec::new(),
            sentiment: MarketSentiment::default(),
            projection,
        };
        session.recompute();
        info!(session = %session.id, strategy = %session.config.strategy, "Session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Record the outcome of the next event at the current stake.
    ///
    /// Returns `Ok(None)` without recording anything when the stake is zero
    /// (lock engaged, Masaniello cycle over, or nothing left to stake).
    pub fn append_trade_result(&mut self, outcome: Outcome) -> Result<Option<Trade>> {
        let stake = self.next_stake;
        if stake <= Decimal::ZERO {
            warn!(
                outcome = outcome.as_str(),
                locked = self.lock.locked,
                "No stake available, event skipped"
            );
            return Ok(None);
        }

        let trade = self
            .ledger
            .append(outcome, stake, self.config.payout_multiplier())?;

        info!(
            sequence = trade.sequence,
            outcome = trade.outcome.as_str(),
            stake = %trade.stake.round_dp(2),
            pnl = %trade.profit_or_loss.round_dp(2),
            balance = %trade.balance_after.round_dp(2),
            "Trade recorded"
        );

        self.recompute();
        Ok(Some(trade))
    }

    /// Replace the configuration with `update` applied on top of it.
    ///
    /// Returns the recovered configuration errors. Before the first trade a
    /// new initial balance also restarts the ledger from that balance.
    pub fn update_configuration(&mut self, update: &ConfigUpdate) -> Vec<TradeGuardError> {
        let (next, errors) = self.config.apply(update);

        if self.ledger.is_empty() && next.initial_balance != self.config.initial_balance {
            self.ledger.reset(next.initial_balance);
        }

        debug!(before = ?self.config, after = ?next, "Configuration updated");
        self.config = next;
        self.recompute();
        errors
    }

    /// Clear trades, lock and insights. Configuration is kept.
    pub fn reset_session(&mut self) {
        self.ledger.reset(self.config.initial_balance);
        self.lock = LockState::unlocked();
        self.insights.clear();
        self.recompute();
        info!(session = %self.id, balance = %self.config.initial_balance, "Session reset");
    }

    /// Update the market sentiment input and re-run the insight rules.
    pub fn set_sentiment(&mut self, sentiment: MarketSentiment) {
        if self.sentiment != sentiment {
            info!(from = %self.sentiment, to = %sentiment, "Market sentiment changed");
        }
        self.sentiment = sentiment;
        self.recompute();
    }

    /// Apply a caller-confirmed advisory action.
    pub fn apply_action(&mut self, action: &SuggestedAction) -> Vec<TradeGuardError> {
        let update = action.to_update(&self.config);
        info!(action = %action.label(), "Applying suggested action");
        self.update_configuration(&update)
    }

    pub fn next_stake(&self) -> Decimal {
        self.next_stake
    }

    /// Profit if the next event wins at the current stake.
    pub fn expected_profit(&self) -> Decimal {
        self.next_stake * self.config.payout_multiplier()
    }

    pub fn lock_state(&self) -> &LockState {
        &self.lock
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn sentiment(&self) -> MarketSentiment {
        self.sentiment
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn state(&self) -> SessionState {
        self.ledger.snapshot()
    }

    pub fn masaniello_progress(&self) -> MasanielloProgress {
        StrategyEngine::masaniello_progress(&self.ledger.snapshot(), &self.config)
    }

    /// Engine for one projection run, with a fresh cancellation token.
    pub fn projection_run(&self) -> ProjectionEngine {
        self.projection
            .clone()
            .with_cancellation(CancellationToken::new())
    }

    /// Project the next trades from the current balance.
    pub fn run_next5_projection<R: Rng>(
        &self,
        sentiment: MarketSentiment,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        self.projection_run()
            .project_next5(&self.ledger.snapshot(), &self.config, sentiment, rng)
    }

    pub fn run_strategy_comparison<R: Rng>(
        &self,
        params: &ComparisonParams,
        rng: &mut R,
    ) -> Result<Vec<StrategyComparisonResult>> {
        self.projection_run().compare_strategies(params, rng)
    }

    pub fn report(&self) -> SessionMetrics {
        MetricsCalculator::calculate(self.ledger.trades(), self.ledger.snapshot().initial_balance)
    }

    fn recompute(&mut self) {
        let snapshot = self.ledger.snapshot();

        let was_locked = self.lock.locked;
        self.lock.latch(SafetyGate::evaluate(&snapshot, &self.config));
        if self.lock.locked && !was_locked {
            warn!(
                reasons = ?self.lock.reasons,
                balance = %snapshot.current_balance.round_dp(2),
                drawdown = %snapshot.current_drawdown.round_dp(2),
                "Safety lock engaged, staking halted until reset"
            );
        }

        self.next_stake = StrategyEngine::next_stake(&snapshot, &self.config, self.lock.locked);

        self.insights = InsightEngine::evaluate(
            &self.ledger,
            &snapshot,
            &self.config,
            self.sentiment,
            &self.insights,
            Utc::now(),
        );
    }
}
