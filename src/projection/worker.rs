//! Run projections on the blocking pool so the caller stays responsive.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::models::{Configuration, MarketSentiment, SessionState};

use super::{ComparisonParams, ProjectionEngine, SimulationResult, StrategyComparisonResult};

/// Run the next-trades projection on a blocking worker thread.
///
/// Cancel through `engine.cancellation_token()`; a cancelled run resolves to
/// a `ProjectionCancelled` error.
pub async fn spawn_next5(
    engine: ProjectionEngine,
    session: SessionState,
    config: Configuration,
    sentiment: MarketSentiment,
    seed: u64,
) -> Result<SimulationResult> {
    tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        engine.project_next5(&session, &config, sentiment, &mut rng)
    })
    .await
    .context("projection worker panicked")?
    .map_err(Into::into)
}

/// Run the strategy comparison on a blocking worker thread.
pub async fn spawn_comparison(
    engine: ProjectionEngine,
    params: ComparisonParams,
    seed: u64,
) -> Result<Vec<StrategyComparisonResult>> {
    tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        engine.compare_strategies(&params, &mut rng)
    })
    .await
    .context("comparison worker panicked")?
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TradeGuardError;
    use rust_decimal_macros::dec;

    fn session() -> SessionState {
        SessionState::new(dec!(100))
    }

    #[tokio::test]
    async fn test_offloaded_matches_inline() {
        let engine = ProjectionEngine::default();
        let config = Configuration::default();

        let offloaded = spawn_next5(engine.clone(), session(), config.clone(), MarketSentiment::Neutral, 99)
            .await
            .unwrap();
        let inline = engine
            .project_next5(&session(), &config, MarketSentiment::Neutral, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(offloaded, inline);
    }

    #[test]
    fn test_comparison_blocks_on_current_thread() {
        let engine = ProjectionEngine::default();
        let params = ComparisonParams::from_config(&Configuration::default());
        let results = tokio_test::block_on(spawn_comparison(engine, params, 5)).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.recommended).count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let engine = ProjectionEngine::default();
        engine.cancellation_token().cancel();

        let err = spawn_comparison(engine, ComparisonParams::from_config(&Configuration::default()), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TradeGuardError>(),
            Some(TradeGuardError::ProjectionCancelled { completed: 0 })
        ));
    }
}
