use async_trait::async_trait;
use execution_core::{
    ExecutorConfig, HttpOrderTransport, OrderExecutor, PaperTransport, SharedTransport,
};
use metrics::create_metrics;
use model::MarketSnapshot;
use parking_lot::Mutex;
use rand::Rng;
use rest_client::RestClient;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use strategy_runner::{
    examples, RiskConfig, RiskManager, RunnerError, SnapshotSource, TradingLoop,
    TradingLoopConfig,
};
use tokio::sync::watch;
use tracing::{error, info};

use common::TradingMode;

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Default order endpoint for live mode.
const DEFAULT_ORDER_PATH: &str = "/api/v3/order";

/// Random-walk market feed for paper runs.
struct SyntheticFeed {
    balance: Decimal,
    prices: Mutex<HashMap<String, Decimal>>,
}

impl SyntheticFeed {
    fn new(balance: Decimal) -> Self {
        Self {
            balance,
            prices: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SnapshotSource for SyntheticFeed {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, RunnerError> {
        let (step, trend, volatility, sentiment): (f64, f64, f64, f64) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(-0.01..0.01),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        };

        let factor = Decimal::from_f64(1.0 + step).ok_or_else(|| RunnerError::MarketData {
            symbol: symbol.to_string(),
            reason: format!("invalid price step {step}"),
        })?;

        let price = {
            let mut prices = self.prices.lock();
            let price = prices.entry(symbol.to_string()).or_insert(dec!(100));
            *price = (*price * factor).round_dp(2);
            *price
        };

        Ok(MarketSnapshot::new(symbol, price, self.balance)
            .with_indicators(trend, volatility, sentiment)
            .with_timestamp(chrono::Utc::now().timestamp_millis()))
    }
}

fn build_transport(mode: TradingMode) -> Option<SharedTransport> {
    if mode.is_paper() {
        return Some(Arc::new(PaperTransport::new()));
    }

    let Ok(base_url) = std::env::var("EXCHANGE_BASE_URL") else {
        error!("EXCHANGE_BASE_URL must be set in live mode");
        return None;
    };
    let client = match RestClient::with_default_timeout(&base_url) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build REST client");
            return None;
        }
    };

    let path =
        std::env::var("EXCHANGE_ORDER_PATH").unwrap_or_else(|_| DEFAULT_ORDER_PATH.to_string());
    let mut transport = HttpOrderTransport::new(client, path);
    if let Ok(api_key) = std::env::var("EXCHANGE_API_KEY") {
        transport = transport.with_header("X-API-KEY", api_key);
    }
    Some(Arc::new(transport))
}

/// Non-zero when the loop halted on its own rather than by shutdown.
fn exit_code(result: &Result<(), RunnerError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    common::init_logging();

    let symbols = std::env::args().skip(1).collect::<Vec<_>>();

    let symbols = if symbols.is_empty() {
        vec!["BTCUSDT".to_string()]
    } else {
        symbols
    };

    let mode = TradingMode::from_env();
    info!(symbols = ?symbols, mode = %mode, "Starting trading bot");

    let Some(transport) = build_transport(mode) else {
        return ExitCode::FAILURE;
    };

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let executor = Arc::new(
        OrderExecutor::new(transport, ExecutorConfig::from_env())
            .with_shutdown(shutdown_rx.clone()),
    );
    let risk = Arc::new(RiskManager::new(RiskConfig::from_env()));
    let metrics = create_metrics();
    let source = Arc::new(SyntheticFeed::new(dec!(10000)));

    let mut trading = TradingLoop::new(symbols, examples::default_strategies(), source, executor)
        .with_config(TradingLoopConfig::default())
        .with_risk_manager(risk.clone())
        .with_metrics(metrics.clone());

    // Spawn ctrl_c handler
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx_clone.send(true);
        }
    });

    // Spawn periodic health reporter
    let health_metrics = metrics.clone();
    let health_risk = risk.clone();
    let mut health_shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = health_metrics.snapshot();
                    let status = snapshot.health_status();
                    info!(
                        status = %status,
                        ticks = snapshot.ticks,
                        allowed = snapshot.decisions_allowed,
                        denied = snapshot.decisions_denied,
                        orders = snapshot.orders_submitted,
                        failed = snapshot.orders_failed,
                        circuit_breaker = health_risk.is_circuit_breaker_triggered(),
                        "Health check"
                    );
                }
                changed = health_shutdown_rx.changed() => {
                    if changed.is_err() || *health_shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let result = trading.run(shutdown_rx).await;
    if let Err(e) = &result {
        error!(error = %e, "Trading loop halted");
    }

    // Print final metrics
    let snapshot = metrics.snapshot();
    println!("\n{}", snapshot);

    for stats in trading.tracker().all_stats() {
        println!(
            "{:<16} trades: {:>4} | pnl: {:>12} | winrate: {:.2} | sharpe: {:.2} | score: {:.2}",
            stats.name,
            stats.trades,
            stats.pnl_total.to_string(),
            stats.winrate,
            stats.sharpe,
            stats.score
        );
    }

    if let Some(best) = trading.tracker().best() {
        println!("best strategy: {best}");
    }

    let _ = shutdown_tx.send(true);
    info!("Shutdown complete");
    exit_code(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_halt_exits_non_zero() {
        let halted = Err(RunnerError::TransportFailuresExceeded {
            failures: 5,
            last_error: "exchange down".into(),
        });
        assert_eq!(exit_code(&halted), ExitCode::FAILURE);
        assert_eq!(exit_code(&Ok(())), ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_synthetic_feed_walks_per_symbol() {
        let feed = SyntheticFeed::new(dec!(1000));
        let first = feed.snapshot("BTCUSDT").await.unwrap();
        let second = feed.snapshot("BTCUSDT").await.unwrap();

        assert_eq!(first.balance, dec!(1000));
        assert!(first.price > dec!(98.9) && first.price < dec!(101.1));
        assert!((second.price - first.price).abs() <= first.price * dec!(0.011));
        assert!((-1.0..1.0).contains(&first.trend));
    }
}
