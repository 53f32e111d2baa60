//! TradeGuard
//!
//! Bankroll manager for binary win/loss trading: sizes the next stake,
//! halts on risk limits, projects outcomes and flags risky patterns.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tradeguard::projection::{spawn_comparison, spawn_next5};
use tradeguard::{
    ComparisonParams, ConfigUpdate, Configuration, MarketSentiment, Outcome, ProjectionEngine,
    Session, SimulationResult, StrategyComparisonResult, TradeGuardError,
};

/// TradeGuard bankroll manager CLI.
#[derive(Parser)]
#[command(name = "tradeguard")]
#[command(about = "Stake sizing and risk control for binary trading sessions", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "TRADEGUARD_LOG")]
    log_level: String,

    /// Seed for projections (random when unset)
    #[arg(long, env = "TRADEGUARD_SEED")]
    seed: Option<u64>,

    /// Override a setting, e.g. `--set strategy=fixed` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session over stdin
    Play,

    /// Feed a sequence of outcomes (e.g. WLWWL) and print the result
    Replay {
        /// Outcomes as W/L characters
        outcomes: String,

        /// Market sentiment (bullish, bearish, high_volatility, neutral)
        #[arg(long, default_value = "neutral")]
        sentiment: String,

        /// Also project the next trades
        #[arg(long)]
        simulate: bool,
    },

    /// Compare fixed, percentage and Masaniello sizing
    Compare {
        /// Starting balance (defaults to the configured initial balance)
        #[arg(long)]
        start: Option<f64>,

        /// Trades per simulated sequence
        #[arg(long, default_value = "100")]
        trades: u32,

        /// Estimated win rate in percent
        #[arg(long, default_value = "55")]
        win_rate: f64,

        /// Payout in percent (defaults to the configured payout)
        #[arg(long)]
        payout: Option<f64>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.overrides);
    let mut seeds = SeedSource::new(cli.seed);

    match cli.command {
        Commands::Play => play(config, &mut seeds).await?,

        Commands::Replay {
            outcomes,
            sentiment,
            simulate,
        } => {
            let sentiment: MarketSentiment = sentiment.parse()?;
            let mut session = Session::new(config);
            session.set_sentiment(sentiment);

            let mut skipped = 0usize;
            for c in outcomes.chars().filter(|c| !c.is_whitespace() && *c != ',') {
                let Some(outcome) = Outcome::parse(&c.to_string()) else {
                    bail!("unknown outcome `{c}`, expected W or L");
                };
                if session.append_trade_result(outcome)?.is_none() {
                    skipped += 1;
                }
            }

            print_status(&session);
            if skipped > 0 {
                println!("Skipped events:  {} (no stake available)", skipped);
            }
            println!("\n{}", session.report());
            print_insights(&session);

            if simulate {
                let result = simulate_next(&session, sentiment, seeds.next()).await?;
                print_simulation(&result);
            }
        }

        Commands::Compare {
            start,
            trades,
            win_rate,
            payout,
        } => {
            let mut params = ComparisonParams::from_config(&config);
            if let Some(start) = start {
                params.start_balance = rust_decimal::Decimal::try_from(start)?;
            }
            if let Some(payout) = payout {
                params.payout = payout / 100.0;
            }
            params.trade_count = trades;
            params.estimated_win_rate = win_rate;

            info!(
                start = %params.start_balance,
                trades = params.trade_count,
                win_rate = params.estimated_win_rate,
                payout = params.payout,
                "Running strategy comparison"
            );

            println!("\n=== Strategy Lab ===");
            println!(
                "Start ${:.2} | {} trades | {:.1}% win rate | {:.0}% payout\n",
                params.start_balance,
                params.trade_count,
                params.estimated_win_rate,
                params.payout * 100.0
            );

            let results = compare(params, seeds.next()).await?;
            for result in &results {
                println!("{}", result);
            }
        }

        Commands::Config => print_config(&config),
    }

    Ok(())
}

/// Defaults, then `TRADEGUARD_*` variables, then `--set` overrides.
fn load_config(overrides: &[String]) -> Configuration {
    let (config, errors) = Configuration::from_env();
    log_recovered(&errors);

    if overrides.is_empty() {
        return config;
    }

    let (update, mut errors) = ConfigUpdate::from_assignments(overrides);
    let (config, apply_errors) = config.apply(&update);
    errors.extend(apply_errors);
    log_recovered(&errors);
    config
}

fn log_recovered(errors: &[TradeGuardError]) {
    for err in errors {
        warn!(error = %err, "Configuration value recovered");
    }
}

/// Seeds for successive projection runs.
struct SeedSource {
    next: Option<u64>,
}

impl SeedSource {
    fn new(seed: Option<u64>) -> Self {
        Self { next: seed }
    }

    fn next(&mut self) -> u64 {
        match self.next.as_mut() {
            Some(seed) => {
                let current = *seed;
                *seed = seed.wrapping_add(1);
                current
            }
            None => rand::thread_rng().next_u64(),
        }
    }
}

async fn simulate_next(session: &Session, sentiment: MarketSentiment, seed: u64) -> Result<SimulationResult> {
    let engine = session.projection_run();
    let token = engine.cancellation_token();

    let run = spawn_next5(engine, session.state(), session.config().clone(), sentiment, seed);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nCancelling projection...");
            token.cancel();
            run.await
        }
    }
}

async fn compare(params: ComparisonParams, seed: u64) -> Result<Vec<StrategyComparisonResult>> {
    let engine = ProjectionEngine::default();
    let token = engine.cancellation_token();

    let run = spawn_comparison(engine, params, seed);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nCancelling comparison...");
            token.cancel();
            run.await
        }
    }
}

async fn play(config: Configuration, seeds: &mut SeedSource) -> Result<()> {
    let mut session = Session::new(config);

    println!("\n=== TradeGuard Session ===");
    println!("Commands: w, l, status, insights, apply <n>, sentiment <s>, set k=v, simulate, reset, quit\n");
    print_status(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match cmd.to_lowercase().as_str() {
            "w" | "win" | "l" | "loss" => {
                let Some(outcome) = Outcome::parse(cmd) else {
                    continue;
                };
                match session.append_trade_result(outcome)? {
                    Some(trade) => println!(
                        "#{} {} stake ${:.2} -> ${:+.2} | balance ${:.2}",
                        trade.sequence,
                        trade.outcome.as_str(),
                        trade.stake,
                        trade.profit_or_loss,
                        trade.balance_after
                    ),
                    None => println!("No stake available; event not recorded."),
                }
                print_next(&session);
            }
            "status" => print_status(&session),
            "report" => println!("{}", session.report()),
            "insights" => print_insights(&session),
            "apply" => {
                let picked = args
                    .first()
                    .and_then(|n| n.parse::<usize>().ok())
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| session.insights().get(i))
                    .and_then(|insight| insight.action.clone());
                match picked {
                    Some(action) => {
                        log_recovered(&session.apply_action(&action));
                        println!("Applied: {}", action.label());
                        print_next(&session);
                    }
                    None => println!("No action at that position. See `insights`."),
                }
            }
            "sentiment" => match args.first().map(|s| s.parse::<MarketSentiment>()) {
                Some(Ok(sentiment)) => {
                    session.set_sentiment(sentiment);
                    println!("Sentiment: {}", sentiment);
                }
                Some(Err(e)) => println!("{}", e),
                None => println!("Sentiment: {}", session.sentiment()),
            },
            "set" => {
                let (update, mut errors) = ConfigUpdate::from_assignments(&args);
                errors.extend(session.update_configuration(&update));
                log_recovered(&errors);
                print_next(&session);
            }
            "simulate" => {
                match simulate_next(&session, session.sentiment(), seeds.next()).await {
                    Ok(result) => print_simulation(&result),
                    Err(e) => println!("Projection failed: {}", e),
                }
            }
            "reset" => {
                session.reset_session();
                print_status(&session);
            }
            "config" => print_config(session.config()),
            "quit" | "exit" | "q" => break,
            other => println!("Unknown command `{}`", other),
        }
    }

    println!("\n{}", session.report());
    Ok(())
}

fn print_next(session: &Session) {
    if session.lock_state().locked {
        println!("LOCKED: trading halted until reset");
    } else {
        println!(
            "Next stake: ${:.2} (win pays ${:.2})",
            session.next_stake(),
            session.expected_profit()
        );
    }
}

fn print_status(session: &Session) {
    let state = session.state();
    let config = session.config();

    println!("\n=== Session {} ===", session.id());
    println!("Strategy:        {} ({})", config.strategy, config.risk_tolerance.as_str());
    println!("Balance:         ${:.2} (peak ${:.2})", state.current_balance, state.peak_balance);
    println!("Net profit:      ${:.2} ({:.2}% ROI)", state.net_profit(), state.roi_pct());
    println!("Drawdown:        {:.2}%", state.current_drawdown);
    println!("Record:          {}W / {}L", state.total_wins, state.total_losses);

    if config.strategy == tradeguard::StrategyKind::Masaniello {
        let progress = session.masaniello_progress();
        println!(
            "Masaniello:      {} trades / {} wins to go ({:?})",
            progress.remaining_trades.max(0),
            progress.remaining_wins.max(0),
            progress.status
        );
    }

    let lock = session.lock_state();
    if lock.locked {
        let reasons: Vec<String> = lock.reasons.iter().map(|r| r.to_string()).collect();
        println!("Lock:            LOCKED ({})", reasons.join(", "));
    } else {
        println!("Lock:            open");
    }
    print_next(session);
}

fn print_insights(session: &Session) {
    let insights = session.insights();
    if insights.is_empty() {
        println!("\nNo insights yet.");
        return;
    }

    println!("\n=== Insights ===");
    for (i, insight) in insights.iter().enumerate() {
        println!(
            "{}. [{}] {}: {}",
            i + 1,
            insight.severity.as_str().to_uppercase(),
            insight.title,
            insight.message
        );
        if let Some(action) = &insight.action {
            println!("   -> {} (apply {})", action.label(), i + 1);
        }
    }
}

fn print_simulation(result: &SimulationResult) {
    println!("\n=== Next 5 Trades ===");
    println!("Win probability:     {:.0}%", result.win_probability * 100.0);
    println!("Profit probability:  {}%", result.probability_of_profit);
    println!("Projected balance:   ${:.2}", result.projected_balance);
    println!("Recommendation:      {:?}", result.recommendation);
}

fn print_config(config: &Configuration) {
    println!("\n=== Configuration ===\n");
    println!("Bankroll:");
    println!("  Initial Balance:      ${}", config.initial_balance);
    println!("  Payout:               {}%", config.payout_percentage);
    println!("  Autopilot:            {}", config.autopilot);

    println!("\nStrategy:");
    println!("  Method:               {}", config.strategy);
    println!("  Fixed Amount:         ${}", config.fixed_amount);
    println!("  Risk Percentage:      {}%", config.risk_percentage);
    println!("  Masaniello:           {} wins in {} events", config.target_wins, config.total_events);
    println!("  Risk Tolerance:       {} (x{})", config.risk_tolerance.as_str(), config.risk_tolerance.multiplier());

    println!("\nRisk Limits (0 = off):");
    println!("  Max Losses:           {}", config.max_losses_allowed);
    println!("  Max Drawdown:         {}%", config.max_drawdown_pct);
    println!("  Take Profit:          ${}", config.session_take_profit);
    println!("  Stop Loss:            ${}", config.session_stop_loss);
}
