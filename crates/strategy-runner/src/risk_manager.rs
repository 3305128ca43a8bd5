//! Pre-trade risk gate.
//!
//! Every call is evaluated from its inputs alone, except for two pieces of
//! instance state: the sticky circuit breaker and the last global PnL
//! history the caller supplied. The breaker is shared by every symbol that
//! uses the same manager, so one global drawdown halts all of them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use execution_core::{Position, PositionSide};
use model::Signal;
use strategy_core::StrategyError;

use crate::drawdown::drawdown;
use crate::error::RiskRejection;
use crate::risk_config::{RiskConfig, StopAnchor};

/// Inputs for one risk evaluation.
#[derive(Debug, Clone)]
pub struct RiskRequest<'a> {
    pub signal: Signal,
    /// Price the signal was generated at.
    pub price: Decimal,
    pub balance: Decimal,
    /// Live position for `symbol`.
    pub position_status: PositionSide,
    /// Per-symbol history, oldest first.
    pub pnl_history: &'a [Decimal],
    pub symbol: &'a str,
    /// Account-wide history, oldest first. `None` keeps the last snapshot.
    pub global_pnl_history: Option<&'a [Decimal]>,
    /// Every live position across symbols.
    pub open_positions: &'a [Position],
    /// Expected fill price, used when stops anchor to execution.
    pub execution_price: Option<Decimal>,
}

impl<'a> RiskRequest<'a> {
    /// Request with no position, no history and no open positions.
    pub fn new(signal: Signal, price: Decimal, balance: Decimal, symbol: &'a str) -> Self {
        Self {
            signal,
            price,
            balance,
            position_status: PositionSide::None,
            pnl_history: &[],
            symbol,
            global_pnl_history: None,
            open_positions: &[],
            execution_price: None,
        }
    }

    pub fn with_position_status(mut self, status: PositionSide) -> Self {
        self.position_status = status;
        self
    }

    pub fn with_pnl_history(mut self, history: &'a [Decimal]) -> Self {
        self.pnl_history = history;
        self
    }

    pub fn with_global_pnl_history(mut self, history: &'a [Decimal]) -> Self {
        self.global_pnl_history = Some(history);
        self
    }

    pub fn with_open_positions(mut self, positions: &'a [Position]) -> Self {
        self.open_positions = positions;
        self
    }

    pub fn with_execution_price(mut self, price: Decimal) -> Self {
        self.execution_price = Some(price);
        self
    }
}

/// Outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskDecision {
    pub allow: bool,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Capital to commit. Nonzero only for a buy with no live position.
    pub allocation: Decimal,
    /// Every limit that denied the trade, in evaluation order.
    pub rejections: Vec<RiskRejection>,
}

/// External hook that can veto an otherwise allowed trade.
///
/// A veto can only turn `allow` off. An `Err` is logged and ignored.
pub trait RiskVeto: Send + Sync {
    fn approve(&self, request: &RiskRequest<'_>) -> Result<bool, StrategyError>;
}

impl<F> RiskVeto for F
where
    F: Fn(&RiskRequest<'_>) -> bool + Send + Sync,
{
    fn approve(&self, request: &RiskRequest<'_>) -> Result<bool, StrategyError> {
        Ok(self(request))
    }
}

/// Current status of the risk manager.
#[derive(Debug, Clone)]
pub struct RiskStatus {
    /// Whether the circuit breaker has tripped.
    pub circuit_breaker_triggered: bool,
    /// Drawdown of the stored global history.
    pub global_drawdown: Decimal,
    /// Length of the stored global history.
    pub global_history_len: usize,
}

/// Risk gate with a sticky circuit breaker.
///
/// # Thread Safety
///
/// - `circuit_breaker` is an atomic so every symbol task sees a trip at once
/// - the global history snapshot is protected by an RwLock
///
/// # Usage
///
/// ```rust,ignore
/// let risk = RiskManager::new(RiskConfig::default());
///
/// let request = RiskRequest::new(Signal::Buy, price, balance, "BTCUSDT")
///     .with_pnl_history(&history)
///     .with_open_positions(&positions);
///
/// let decision = risk.apply_risk(&request);
/// if decision.allow {
///     // build and execute the order
/// }
///
/// // Operator action after investigating a trip
/// risk.reset_circuit_breaker();
/// ```
pub struct RiskManager {
    config: RiskConfig,
    circuit_breaker: AtomicBool,
    global_pnl_history: RwLock<Vec<Decimal>>,
    veto: Option<Arc<dyn RiskVeto>>,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            circuit_breaker: AtomicBool::new(false),
            global_pnl_history: RwLock::new(Vec::new()),
            veto: None,
        }
    }

    /// Install an external veto hook.
    pub fn with_veto(mut self, veto: Arc<dyn RiskVeto>) -> Self {
        self.veto = Some(veto);
        self
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Stop-loss and take-profit around `price`.
    pub fn calculate_sl_tp(&self, price: Decimal) -> (Decimal, Decimal) {
        let hundred = Decimal::ONE_HUNDRED;
        let stop_loss = price * (Decimal::ONE - self.config.sl_pct / hundred);
        let take_profit = price * (Decimal::ONE + self.config.tp_pct / hundred);
        (stop_loss, take_profit)
    }

    /// Evaluate a proposed trade.
    ///
    /// Checks run in a fixed order and all of them run even after a denial,
    /// so `rejections` lists every violated limit.
    pub fn apply_risk(&self, request: &RiskRequest<'_>) -> RiskDecision {
        let config = &self.config;
        let mut rejections = Vec::new();

        let (mut stop_loss, take_profit) = self.calculate_sl_tp(request.price);

        let mut allocation =
            if request.position_status.is_none() && request.signal == Signal::Buy {
                request.balance * config.allocation_pct
            } else {
                Decimal::ZERO
            };

        // Losing streak scale-down
        let window = config.exposure_scale_window;
        if window > 0 && request.pnl_history.len() >= window {
            let recent = &request.pnl_history[request.pnl_history.len() - window..];
            if recent.iter().all(|p| *p < Decimal::ZERO) {
                allocation *= config.exposure_scale_factor;
                info!(
                    symbol = %request.symbol,
                    allocation = %allocation,
                    window,
                    "exposure scaled down after losing streak"
                );
            }
        }

        // Per-symbol rolling drawdown
        if !request.pnl_history.is_empty() {
            let current = drawdown(request.pnl_history, config.drawdown_window);
            if current >= config.max_drawdown {
                warn!(
                    symbol = %request.symbol,
                    drawdown = %current,
                    limit = %config.max_drawdown,
                    "trade blocked by drawdown limit"
                );
                rejections.push(RiskRejection::DrawdownLimitExceeded {
                    current,
                    limit: config.max_drawdown,
                });
            }
        }

        // Global drawdown circuit breaker
        let mut tripped_now = false;
        if let Some(global) = request.global_pnl_history.filter(|h| !h.is_empty()) {
            *self.global_pnl_history.write() = global.to_vec();

            let global_drawdown = drawdown(global, config.circuit_breaker_window);
            if global_drawdown >= config.circuit_breaker_drawdown {
                tripped_now = true;
                if !self.circuit_breaker.swap(true, Ordering::SeqCst) {
                    error!(
                        drawdown = %global_drawdown,
                        limit = %config.circuit_breaker_drawdown,
                        "CIRCUIT BREAKER TRIGGERED"
                    );
                }
                rejections.push(RiskRejection::CircuitBreakerTriggered {
                    drawdown: global_drawdown,
                    limit: config.circuit_breaker_drawdown,
                });
            }
        }
        if !tripped_now && self.is_circuit_breaker_triggered() {
            rejections.push(RiskRejection::CircuitBreakerActive);
        }

        // Exposure limits
        if !request.open_positions.is_empty() {
            let total: Decimal = request.open_positions.iter().map(Position::allocation).sum();
            let global_limit = request.balance * config.max_global_exposure;
            if total > global_limit {
                warn!(exposure = %total, limit = %global_limit, "global exposure limit exceeded");
                rejections.push(RiskRejection::GlobalExposureExceeded {
                    current: total,
                    limit: global_limit,
                });
            }

            let symbol_total: Decimal = request
                .open_positions
                .iter()
                .filter(|p| p.symbol == request.symbol)
                .map(Position::allocation)
                .sum();
            let symbol_limit = request.balance * config.max_symbol_exposure;
            if symbol_total > symbol_limit {
                warn!(
                    symbol = %request.symbol,
                    exposure = %symbol_total,
                    limit = %symbol_limit,
                    "symbol exposure limit exceeded"
                );
                rejections.push(RiskRejection::SymbolExposureExceeded {
                    symbol: request.symbol.to_string(),
                    current: symbol_total,
                    limit: symbol_limit,
                });
            }
        }

        // Trailing-stop floor
        if config.trailing_stop_pct > Decimal::ZERO {
            let anchor = match config.trailing_anchor {
                StopAnchor::SignalPrice => request.price,
                StopAnchor::ExecutionPrice => request.execution_price.unwrap_or(request.price),
            };
            stop_loss = stop_loss.max(anchor * (Decimal::ONE - config.trailing_stop_pct));
        }

        // External veto
        if let Some(veto) = &self.veto {
            match veto.approve(request) {
                Ok(true) => {}
                Ok(false) => {
                    info!(symbol = %request.symbol, "trade blocked by risk tuner");
                    rejections.push(RiskRejection::Vetoed);
                }
                Err(e) => {
                    error!(symbol = %request.symbol, error = %e, "risk tuner failed, ignoring");
                }
            }
        }

        let allow = rejections.is_empty();
        info!(
            symbol = %request.symbol,
            signal = %request.signal,
            allow,
            stop_loss = %stop_loss,
            take_profit = %take_profit,
            allocation = %allocation,
            "risk decision"
        );

        RiskDecision {
            allow,
            stop_loss,
            take_profit,
            allocation,
            rejections,
        }
    }

    pub fn is_circuit_breaker_triggered(&self) -> bool {
        self.circuit_breaker.load(Ordering::SeqCst)
    }

    /// Clear the circuit breaker. Operator action only.
    pub fn reset_circuit_breaker(&self) {
        if self.circuit_breaker.swap(false, Ordering::SeqCst) {
            warn!("circuit breaker reset by operator");
        }
    }

    /// Last global history supplied by a caller.
    pub fn global_pnl_history(&self) -> Vec<Decimal> {
        self.global_pnl_history.read().clone()
    }

    pub fn status(&self) -> RiskStatus {
        let history = self.global_pnl_history.read();
        RiskStatus {
            circuit_breaker_triggered: self.is_circuit_breaker_triggered(),
            global_drawdown: drawdown(&history, self.config.circuit_breaker_window),
            global_history_len: history.len(),
        }
    }
}

/// Shared risk manager type.
pub type SharedRiskManager = Arc<RiskManager>;

#[cfg(test)]
mod tests {
    use super::*;
    use execution_core::{OrderSide, PositionManager};
    use rust_decimal_macros::dec;

    fn make_risk_manager() -> RiskManager {
        RiskManager::new(RiskConfig::default())
    }

    fn buy(symbol: &str) -> RiskRequest<'_> {
        RiskRequest::new(Signal::Buy, dec!(100), dec!(1000), symbol)
    }

    fn open_position(symbol: &str, amount: Decimal, price: Decimal) -> Position {
        let pm = PositionManager::new();
        pm.open_or_update(symbol, OrderSide::Buy, amount, price, 0);
        pm.get_position(symbol).unwrap()
    }

    #[test]
    fn test_plain_buy_is_allowed() {
        let rm = make_risk_manager();
        let decision = rm.apply_risk(&buy("BTCUSDT"));

        assert!(decision.allow);
        assert_eq!(decision.stop_loss, dec!(99.5));
        assert_eq!(decision.take_profit, dec!(101));
        assert_eq!(decision.allocation, dec!(1000));
        assert!(decision.rejections.is_empty());
    }

    #[test]
    fn test_allocation_zero_with_position_or_non_buy() {
        let rm = make_risk_manager();

        let with_position = buy("BTCUSDT").with_position_status(PositionSide::Long);
        assert_eq!(rm.apply_risk(&with_position).allocation, Decimal::ZERO);

        let short = buy("BTCUSDT").with_position_status(PositionSide::Short);
        assert_eq!(rm.apply_risk(&short).allocation, Decimal::ZERO);

        for signal in [Signal::Sell, Signal::Close, Signal::Hold] {
            let request = RiskRequest::new(signal, dec!(100), dec!(1000), "BTCUSDT");
            assert_eq!(rm.apply_risk(&request).allocation, Decimal::ZERO);
        }
    }

    #[test]
    fn test_drawdown_blocks_at_limit() {
        let rm = make_risk_manager();
        let history = [dec!(1000), dec!(950), dec!(900)];

        let decision = rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&history));

        assert!(!decision.allow);
        assert_eq!(
            decision.rejections,
            vec![RiskRejection::DrawdownLimitExceeded {
                current: dec!(0.1),
                limit: dec!(0.1),
            }]
        );
    }

    #[test]
    fn test_small_drawdown_allowed() {
        let rm = make_risk_manager();
        let history = [dec!(1000), dec!(990), dec!(980)];

        assert!(rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&history)).allow);
    }

    #[test]
    fn test_losing_streak_scales_allocation() {
        let rm = RiskManager::new(RiskConfig::default().with_max_drawdown(dec!(100)));
        let streak = [dec!(-1), dec!(-2), dec!(-3), dec!(-4), dec!(-5)];
        let short_streak = [dec!(-1), dec!(-2), dec!(-3), dec!(-4)];
        let broken_streak = [dec!(-1), dec!(-2), dec!(3), dec!(-4), dec!(-5)];

        let scaled = rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&streak));
        assert_eq!(scaled.allocation, dec!(500));

        let short = rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&short_streak));
        assert_eq!(short.allocation, dec!(1000));

        let broken = rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&broken_streak));
        assert_eq!(broken.allocation, dec!(1000));
    }

    #[test]
    fn test_circuit_breaker_is_sticky() {
        let rm = make_risk_manager();
        let crash = [dec!(1000), dec!(900), dec!(750)];

        let decision = rm.apply_risk(&buy("BTCUSDT").with_global_pnl_history(&crash));
        assert!(!decision.allow);
        assert!(matches!(
            decision.rejections[0],
            RiskRejection::CircuitBreakerTriggered { .. }
        ));
        assert!(rm.is_circuit_breaker_triggered());

        // Healthy inputs, different symbol: still denied
        let healthy = [dec!(1000), dec!(1010)];
        for symbol in ["BTCUSDT", "ETHUSDT"] {
            let decision = rm.apply_risk(&buy(symbol).with_global_pnl_history(&healthy));
            assert!(!decision.allow);
            assert_eq!(decision.rejections, vec![RiskRejection::CircuitBreakerActive]);
        }
        assert!(!rm.apply_risk(&buy("BTCUSDT")).allow);
    }

    #[test]
    fn test_reset_circuit_breaker() {
        let rm = make_risk_manager();
        let crash = [dec!(100), dec!(50)];
        rm.apply_risk(&buy("BTCUSDT").with_global_pnl_history(&crash));
        assert!(rm.status().circuit_breaker_triggered);

        rm.reset_circuit_breaker();
        assert!(!rm.is_circuit_breaker_triggered());
        assert!(rm.apply_risk(&buy("BTCUSDT")).allow);
    }

    #[test]
    fn test_global_history_kept_when_not_supplied() {
        let rm = make_risk_manager();
        let history = [dec!(1000), dec!(1005)];
        rm.apply_risk(&buy("BTCUSDT").with_global_pnl_history(&history));

        rm.apply_risk(&buy("BTCUSDT"));
        rm.apply_risk(&buy("BTCUSDT").with_global_pnl_history(&[]));

        assert_eq!(rm.global_pnl_history(), history.to_vec());
        assert_eq!(rm.status().global_history_len, 2);
    }

    #[test]
    fn test_circuit_breaker_uses_last_twenty() {
        let rm = make_risk_manager();
        let mut history = vec![dec!(5000)];
        history.extend(std::iter::repeat(dec!(1000)).take(20));

        assert!(rm.apply_risk(&buy("BTCUSDT").with_global_pnl_history(&history)).allow);
        assert!(!rm.is_circuit_breaker_triggered());
    }

    #[test]
    fn test_global_exposure_limit() {
        let rm = make_risk_manager();
        let positions = vec![
            open_position("ETHUSDT", dec!(4), dec!(150)),
            open_position("SOLUSDT", dec!(5), dec!(100)),
        ];

        let decision = rm.apply_risk(&buy("BTCUSDT").with_open_positions(&positions));

        assert!(!decision.allow);
        assert_eq!(
            decision.rejections,
            vec![RiskRejection::GlobalExposureExceeded {
                current: dec!(1100),
                limit: dec!(1000),
            }]
        );
    }

    #[test]
    fn test_symbol_exposure_limit() {
        let rm = make_risk_manager();
        let positions = vec![
            open_position("BTCUSDT", dec!(6), dec!(100)),
            open_position("ETHUSDT", dec!(1), dec!(100)),
        ];

        let btc = rm.apply_risk(&buy("BTCUSDT").with_open_positions(&positions));
        assert!(matches!(
            btc.rejections.as_slice(),
            [RiskRejection::SymbolExposureExceeded { symbol, .. }] if symbol == "BTCUSDT"
        ));

        let eth = rm.apply_risk(&buy("ETHUSDT").with_open_positions(&positions));
        assert!(eth.allow);
    }

    #[test]
    fn test_trailing_stop_floor() {
        let rm = RiskManager::new(
            RiskConfig::default()
                .with_sl_tp_pct(dec!(10), dec!(1))
                .with_trailing_stop(dec!(0.05), StopAnchor::SignalPrice),
        );
        // raw stop 90, floor 95
        assert_eq!(rm.apply_risk(&buy("BTCUSDT")).stop_loss, dec!(95));

        let disabled = RiskManager::new(
            RiskConfig::default()
                .with_sl_tp_pct(dec!(10), dec!(1))
                .with_trailing_stop(Decimal::ZERO, StopAnchor::SignalPrice),
        );
        assert_eq!(disabled.apply_risk(&buy("BTCUSDT")).stop_loss, dec!(90));
    }

    #[test]
    fn test_trailing_stop_execution_anchor() {
        let rm = RiskManager::new(
            RiskConfig::default()
                .with_sl_tp_pct(dec!(10), dec!(1))
                .with_trailing_stop(dec!(0.05), StopAnchor::ExecutionPrice),
        );

        let with_fill = buy("BTCUSDT").with_execution_price(dec!(120));
        assert_eq!(rm.apply_risk(&with_fill).stop_loss, dec!(114));

        // Falls back to the signal price without a fill estimate
        assert_eq!(rm.apply_risk(&buy("BTCUSDT")).stop_loss, dec!(95));
    }

    fn always_deny(_request: &RiskRequest<'_>) -> bool {
        false
    }

    fn always_approve(_request: &RiskRequest<'_>) -> bool {
        true
    }

    #[test]
    fn test_veto_can_only_deny() {
        let rm = make_risk_manager().with_veto(Arc::new(always_deny));
        let decision = rm.apply_risk(&buy("BTCUSDT"));
        assert_eq!(decision.rejections, vec![RiskRejection::Vetoed]);

        let rm = make_risk_manager().with_veto(Arc::new(always_approve));
        let history = [dec!(1000), dec!(800)];
        let decision = rm.apply_risk(&buy("BTCUSDT").with_pnl_history(&history));
        assert!(!decision.allow);
    }

    #[test]
    fn test_failing_veto_is_ignored() {
        struct Broken;
        impl RiskVeto for Broken {
            fn approve(&self, _request: &RiskRequest<'_>) -> Result<bool, StrategyError> {
                Err(StrategyError::AnalysisFailed("model offline".into()))
            }
        }

        let rm = make_risk_manager().with_veto(Arc::new(Broken));
        assert!(rm.apply_risk(&buy("BTCUSDT")).allow);
    }

    #[test]
    fn test_zero_price_does_not_panic() {
        let rm = make_risk_manager();
        let request = RiskRequest::new(Signal::Buy, Decimal::ZERO, Decimal::ZERO, "BTCUSDT")
            .with_pnl_history(&[Decimal::ZERO, Decimal::ZERO]);

        let decision = rm.apply_risk(&request);
        assert!(decision.allow);
        assert_eq!(decision.stop_loss, Decimal::ZERO);
    }
}
