//! Example strategy implementations.
//!
//! One strategy per canonical name the router's regime splits know about.
//! They read only the snapshot and are meant as templates, not as models.

mod breakout;
mod grid;
mod indicator;

use std::sync::Arc;

use strategy_core::SharedStrategy;

pub use breakout::BreakoutStrategy;
pub use grid::GridStrategy;
pub use indicator::{Indicator, IndicatorConfig, IndicatorStrategy, Threshold};

/// Every example strategy, in registration order.
pub fn default_strategies() -> Vec<SharedStrategy> {
    vec![
        Arc::new(IndicatorStrategy::trend_following()),
        Arc::new(IndicatorStrategy::momentum()),
        Arc::new(IndicatorStrategy::mean_reversion()),
        Arc::new(GridStrategy::grid_trading()),
        Arc::new(IndicatorStrategy::market_making()),
        Arc::new(IndicatorStrategy::sentiment()),
        Arc::new(BreakoutStrategy::default()),
        Arc::new(GridStrategy::arbitrage()),
    ]
}
