//! Grid strategy around a moving anchor price.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use model::{MarketSnapshot, Signal};
use strategy_core::{Strategy, StrategyError};

/// Buys a step below the anchor and exits a step above it.
///
/// The anchor is the first price seen per symbol and moves to the price of
/// every triggered level.
pub struct GridStrategy {
    name: String,
    /// Grid step as a fraction of the anchor.
    spacing: Decimal,
    anchors: Mutex<HashMap<String, Decimal>>,
}

impl GridStrategy {
    pub fn new(name: impl Into<String>, spacing: Decimal) -> Result<Self, StrategyError> {
        if spacing <= Decimal::ZERO || spacing >= Decimal::ONE {
            return Err(StrategyError::InvalidConfig(format!(
                "grid spacing must be in (0, 1), got {spacing}"
            )));
        }
        Ok(Self {
            name: name.into(),
            spacing,
            anchors: Mutex::new(HashMap::new()),
        })
    }

    /// Half-percent grid.
    pub fn grid_trading() -> Self {
        Self {
            name: "GridTrading".into(),
            spacing: dec!(0.005),
            anchors: Mutex::new(HashMap::new()),
        }
    }

    /// Tight grid catching small dislocations around the last level.
    pub fn arbitrage() -> Self {
        Self {
            name: "Arbitrage".into(),
            spacing: dec!(0.001),
            anchors: Mutex::new(HashMap::new()),
        }
    }

    pub fn anchor(&self, symbol: &str) -> Option<Decimal> {
        self.anchors.lock().get(symbol).copied()
    }
}

impl Strategy for GridStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
        let price = snapshot.price;
        if price <= Decimal::ZERO {
            return Err(StrategyError::NoMarketData(snapshot.symbol.clone()));
        }

        let mut anchors = self.anchors.lock();
        let Some(anchor) = anchors.get(&snapshot.symbol).copied() else {
            anchors.insert(snapshot.symbol.clone(), price);
            return Ok(Signal::Hold);
        };

        let signal = if price <= anchor * (Decimal::ONE - self.spacing) {
            Signal::Buy
        } else if price >= anchor * (Decimal::ONE + self.spacing) {
            Signal::Close
        } else {
            return Ok(Signal::Hold);
        };

        anchors.insert(snapshot.symbol.clone(), price);
        debug!(
            strategy = %self.name,
            symbol = %snapshot.symbol,
            anchor = %anchor,
            price = %price,
            signal = %signal,
            "grid level crossed"
        );
        Ok(signal)
    }
}
