//! Decision core for the multi-strategy trading bot.
//!
//! This crate turns market snapshots into risk-gated orders:
//!
//! - **DynamicStrategyRouter**: classifies the regime and weights strategies
//! - **StrategyPerformanceTracker**: realized PnL per strategy, feeds routing
//! - **RiskManager**: stops, drawdown, exposure and the sticky circuit breaker
//! - **TradingLoop**: drives the pipeline per symbol per tick
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Snapshot     │──>│ Router          │──>│ RiskManager  │──>│ OrderExecutor │
//! │ Source       │   │ - regime        │   │ - SL/TP      │   │ - throttle    │
//! └──────────────┘   │ - allocation    │   │ - drawdown   │   │ - retry       │
//!                    │ - analyze       │   │ - exposure   │   └───────────────┘
//!                    └─────────────────┘   │ - breaker    │           │
//!                            ^             └──────────────┘           v
//!                            │                               ┌───────────────┐
//!                            │          update(pnl)          │ Position      │
//!                    ┌───────────────┐<──────────────────────│ Manager       │
//!                    │ Tracker       │                       └───────────────┘
//!                    └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strategy_runner::{examples, TradingLoop};
//!
//! let mut trading = TradingLoop::new(symbols, examples::default_strategies(), source, executor)
//!     .with_risk_manager(risk);
//!
//! trading.run(shutdown_rx).await?;
//! ```

mod drawdown;
mod error;
mod events;
pub mod examples;
mod risk_config;
mod risk_manager;
mod router;
mod runner;
mod signal_processor;
mod tracker;

pub use drawdown::drawdown;
pub use error::{RiskRejection, RunnerError};
pub use events::{DecisionEvent, EquityEvent, EventSink, MemoryEventSink, TracingEventSink};
pub use risk_config::{RiskConfig, StopAnchor};
pub use risk_manager::{
    RiskDecision, RiskManager, RiskRequest, RiskStatus, RiskVeto, SharedRiskManager,
};
pub use router::{
    Allocation, DynamicStrategyRouter, EnsembleSignal, Regime, RegimeThresholds, RouterConfig,
    RouterStatus,
};
pub use runner::{SnapshotSource, TradingLoop, TradingLoopConfig};
pub use signal_processor::{select_signal, SelectedSignal};
pub use tracker::{
    create_tracker, SharedTracker, StrategyMetrics, StrategyPerformanceTracker, StrategyStats,
    DEFAULT_DRAWDOWN_WINDOW,
};
