//! Trading loop - ties routing, risk, execution and bookkeeping together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use execution_core::{
    create_position_manager, Order, OrderExecutor, OrderSide, PositionSide, SharedPositionManager,
};
use metrics::{create_metrics, SharedMetrics};
use model::{MarketSnapshot, Signal};
use strategy_core::SharedStrategy;

use crate::error::{RiskRejection, RunnerError};
use crate::events::{DecisionEvent, EquityEvent, EventSink, TracingEventSink};
use crate::risk_config::RiskConfig;
use crate::risk_manager::{RiskDecision, RiskManager, RiskRequest, SharedRiskManager};
use crate::router::{DynamicStrategyRouter, Regime, RouterConfig};
use crate::signal_processor::{select_signal, SelectedSignal};
use crate::tracker::{create_tracker, SharedTracker};

/// Supplies the market snapshot for a symbol each tick.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, RunnerError>;
}

/// Configuration for the trading loop.
#[derive(Debug, Clone)]
pub struct TradingLoopConfig {
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Consecutive failed executions that stop the loop.
    pub max_consecutive_failures: u32,
    /// Configuration for every per-symbol router.
    pub router: RouterConfig,
}

impl Default for TradingLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_consecutive_failures: 5,
            router: RouterConfig::default(),
        }
    }
}

impl TradingLoopConfig {
    /// Builder method to set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Builder method to set the failure threshold.
    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }
}

/// What an allowed decision turns into.
enum Action {
    Open { quantity: Decimal },
    Close { side: OrderSide, quantity: Decimal },
}

/// Drives the decision pipeline once per symbol per tick.
///
/// Within a symbol the order is always route, risk, execute, positions,
/// tracker. Only an acknowledged order touches positions or the tracker.
pub struct TradingLoop {
    config: TradingLoopConfig,
    symbols: Vec<String>,
    strategies: Vec<SharedStrategy>,
    source: Arc<dyn SnapshotSource>,
    executor: Arc<OrderExecutor>,
    tracker: SharedTracker,
    positions: SharedPositionManager,
    risk: SharedRiskManager,
    metrics: SharedMetrics,
    events: Arc<dyn EventSink>,
    /// Built on first use.
    routers: HashMap<String, DynamicStrategyRouter>,
    /// Per-symbol equity after each closed trade, trimmed to the
    /// longest window the risk checks read.
    symbol_history: HashMap<String, Vec<Decimal>>,
    /// Balance seen on each processed snapshot, trimmed to the circuit
    /// breaker window.
    equity_history: Vec<Decimal>,
    /// Strategy that opened each live position.
    openers: HashMap<String, String>,
    consecutive_failures: u32,
}

impl TradingLoop {
    pub fn new(
        symbols: Vec<String>,
        strategies: Vec<SharedStrategy>,
        source: Arc<dyn SnapshotSource>,
        executor: Arc<OrderExecutor>,
    ) -> Self {
        Self {
            config: TradingLoopConfig::default(),
            symbols,
            strategies,
            source,
            executor,
            tracker: create_tracker(),
            positions: create_position_manager(),
            risk: Arc::new(RiskManager::new(RiskConfig::default())),
            metrics: create_metrics(),
            events: Arc::new(TracingEventSink),
            routers: HashMap::new(),
            symbol_history: HashMap::new(),
            equity_history: Vec::new(),
            openers: HashMap::new(),
            consecutive_failures: 0,
        }
    }

    pub fn with_config(mut self, config: TradingLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tracker(mut self, tracker: SharedTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_positions(mut self, positions: SharedPositionManager) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_risk_manager(mut self, risk: SharedRiskManager) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    pub fn positions(&self) -> &SharedPositionManager {
        &self.positions
    }

    pub fn risk_manager(&self) -> &SharedRiskManager {
        &self.risk
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Router for a symbol, once it has been ticked.
    pub fn router(&self, symbol: &str) -> Option<&DynamicStrategyRouter> {
        self.routers.get(symbol)
    }

    /// Equity history for a symbol, oldest first.
    pub fn symbol_history(&self, symbol: &str) -> &[Decimal] {
        self.symbol_history
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn equity_history(&self) -> &[Decimal] {
        &self.equity_history
    }

    /// Tick until shutdown turns true or its sender is dropped.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), RunnerError> {
        if self.symbols.is_empty() {
            return Err(RunnerError::NoSymbols);
        }
        if self.strategies.is_empty() {
            return Err(RunnerError::NoStrategies);
        }

        info!(
            symbols = ?self.symbols,
            strategies = self.strategies.len(),
            tick_ms = self.config.tick_interval.as_millis() as u64,
            "starting trading loop"
        );

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown_rx.borrow() {
                info!("shutdown signal received");
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        warn!("shutdown channel closed");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }

        info!(ticks = self.metrics.ticks(), "trading loop stopped");
        Ok(())
    }

    /// Run the pipeline once for every symbol.
    ///
    /// Only repeated transport failures are returned as errors.
    pub async fn tick(&mut self) -> Result<(), RunnerError> {
        self.metrics.inc_ticks();

        let symbols = self.symbols.clone();
        for symbol in &symbols {
            let snapshot = match self.source.snapshot(symbol).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "skipping symbol this tick");
                    continue;
                }
            };
            self.process_snapshot(snapshot).await?;
        }

        Ok(())
    }

    async fn process_snapshot(&mut self, snapshot: MarketSnapshot) -> Result<(), RunnerError> {
        let symbol = snapshot.symbol.clone();
        let timestamp_ms = if snapshot.timestamp_ms > 0 {
            snapshot.timestamp_ms
        } else {
            chrono::Utc::now().timestamp_millis()
        };
        let global_window = self.risk.config().circuit_breaker_window;
        push_capped(&mut self.equity_history, snapshot.balance, global_window);

        // Route
        let router = self.routers.entry(symbol.clone()).or_insert_with(|| {
            DynamicStrategyRouter::new(self.strategies.clone(), self.tracker.clone())
                .with_config(self.config.router.clone())
        });
        let regime = router.detect_regime(&snapshot);
        let entries = router.route(&snapshot);

        for entry in entries.iter().filter(|e| e.error.is_some()) {
            self.metrics.inc_strategy_errors();
            debug!(symbol = %symbol, strategy = %entry.strategy, "strategy error recorded");
        }

        let Some(selected) = select_signal(&entries) else {
            debug!(symbol = %symbol, regime = %regime, "no signal this tick");
            return Ok(());
        };
        if !selected.signal.is_actionable() {
            debug!(symbol = %symbol, strategy = %selected.strategy, "hold");
            return Ok(());
        }

        // Risk
        let position_status = self.positions.status(&symbol);
        let decision = {
            let open_positions = self.positions.open_positions();
            let request = RiskRequest::new(
                selected.signal,
                snapshot.price,
                snapshot.balance,
                &symbol,
            )
            .with_position_status(position_status)
            .with_pnl_history(self.symbol_history(&symbol))
            .with_global_pnl_history(&self.equity_history)
            .with_open_positions(&open_positions);
            self.risk.apply_risk(&request)
        };

        let action = plan(
            &selected,
            position_status,
            &decision,
            snapshot.price,
            &self.positions,
            &symbol,
        );
        let permitted = decision.allow || (is_exit(&action) && only_exposure(&decision.rejections));
        self.record_decision(&snapshot, regime, &selected, &decision, permitted, timestamp_ms);

        if !permitted {
            return Ok(());
        }
        let Some(action) = action else {
            debug!(
                symbol = %symbol,
                signal = %selected.signal,
                position = %position_status,
                "nothing to execute"
            );
            return Ok(());
        };

        // Execute
        let order = match &action {
            Action::Open { quantity } => Order::new(&symbol, OrderSide::Buy, *quantity, snapshot.price),
            Action::Close { side, quantity } => Order::new(&symbol, *side, *quantity, snapshot.price),
        }
        .with_stops(decision.stop_loss, decision.take_profit);

        match self.executor.execute(&order).await {
            Ok(submission) => {
                self.consecutive_failures = 0;
                self.metrics.inc_orders_submitted();
                self.metrics.add_submit_attempts(u64::from(submission.attempts));
            }
            Err(e) if e.is_cancelled() => {
                self.metrics.add_submit_attempts(u64::from(e.attempts()));
                info!(
                    symbol = %symbol,
                    client_order_id = %order.client_order_id,
                    "order cancelled, nothing recorded"
                );
                return Ok(());
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.metrics.inc_orders_failed();
                self.metrics.add_submit_attempts(u64::from(e.attempts()));
                error!(
                    symbol = %symbol,
                    client_order_id = %order.client_order_id,
                    failures = self.consecutive_failures,
                    error = %e,
                    "order failed"
                );

                if self.consecutive_failures >= self.config.max_consecutive_failures {
                    return Err(RunnerError::TransportFailuresExceeded {
                        failures: self.consecutive_failures,
                        last_error: e.to_string(),
                    });
                }
                return Ok(());
            }
        }

        // Positions and tracker
        match action {
            Action::Open { quantity } => {
                self.positions
                    .open_or_update(&symbol, OrderSide::Buy, quantity, snapshot.price, timestamp_ms);
                self.openers.insert(symbol, selected.strategy);
            }
            Action::Close { .. } => {
                self.record_close(&snapshot, &selected, timestamp_ms);
            }
        }

        Ok(())
    }

    fn record_close(&mut self, snapshot: &MarketSnapshot, selected: &SelectedSignal, timestamp_ms: i64) {
        let symbol = &snapshot.symbol;
        let Some(closed) = self.positions.close(symbol, timestamp_ms) else {
            return;
        };

        let realized_pnl = closed.pnl_at(snapshot.price);
        let strategy = self
            .openers
            .remove(symbol)
            .unwrap_or_else(|| selected.strategy.clone());
        self.tracker.update(&strategy, realized_pnl);

        let equity = snapshot.balance + realized_pnl;
        let config = self.risk.config();
        let symbol_window = config.drawdown_window.max(config.exposure_scale_window);
        push_capped(
            self.symbol_history.entry(symbol.clone()).or_default(),
            equity,
            symbol_window,
        );

        info!(
            symbol = %symbol,
            strategy = %strategy,
            realized_pnl = %realized_pnl,
            equity = %equity,
            "trade realized"
        );

        self.events.on_equity(&EquityEvent {
            timestamp_ms,
            symbol: symbol.clone(),
            strategy,
            realized_pnl,
            equity,
        });
    }

    fn record_decision(
        &self,
        snapshot: &MarketSnapshot,
        regime: Regime,
        selected: &SelectedSignal,
        decision: &RiskDecision,
        permitted: bool,
        timestamp_ms: i64,
    ) {
        let reasons: Vec<String> = decision.rejections.iter().map(ToString::to_string).collect();

        if permitted {
            self.metrics.inc_decisions_allowed();
        } else {
            self.metrics.inc_decisions_denied();
        }

        info!(
            symbol = %snapshot.symbol,
            regime = %regime,
            strategy = %selected.strategy,
            signal = %selected.signal,
            allow = permitted,
            reasons = ?reasons,
            "decision"
        );

        self.events.on_decision(&DecisionEvent {
            timestamp_ms,
            symbol: snapshot.symbol.clone(),
            regime,
            strategy: selected.strategy.clone(),
            signal: selected.signal,
            price: snapshot.price,
            allow: permitted,
            stop_loss: decision.stop_loss,
            take_profit: decision.take_profit,
            allocation: decision.allocation,
            reasons,
        });
    }
}

/// Turn a signal into an order action, if it has one.
///
/// `Buy` opens a long when flat. `Sell` and `Close` flatten a live position.
fn plan(
    selected: &SelectedSignal,
    status: PositionSide,
    decision: &RiskDecision,
    price: Decimal,
    positions: &SharedPositionManager,
    symbol: &str,
) -> Option<Action> {
    match (selected.signal, status) {
        (Signal::Buy, PositionSide::None) => {
            if price <= Decimal::ZERO || decision.allocation <= Decimal::ZERO {
                return None;
            }
            Some(Action::Open {
                quantity: decision.allocation / price,
            })
        }
        (Signal::Sell | Signal::Close, PositionSide::Long | PositionSide::Short) => {
            let position = positions.get_position(symbol)?;
            let side = match position.side {
                PositionSide::Long => OrderSide::Sell,
                PositionSide::Short => OrderSide::Buy,
                PositionSide::None => return None,
            };
            Some(Action::Close {
                side,
                quantity: position.amount.abs(),
            })
        }
        _ => None,
    }
}

fn is_exit(action: &Option<Action>) -> bool {
    matches!(action, Some(Action::Close { .. }))
}

/// Exposure caps limit new capital, so they never hold a position open.
/// Append and drop the oldest values beyond `cap` (at least one is kept).
fn push_capped(history: &mut Vec<Decimal>, value: Decimal, cap: usize) {
    history.push(value);
    let excess = history.len().saturating_sub(cap.max(1));
    if excess > 0 {
        history.drain(..excess);
    }
}

fn only_exposure(rejections: &[RiskRejection]) -> bool {
    rejections.iter().all(RiskRejection::is_exposure)
}
