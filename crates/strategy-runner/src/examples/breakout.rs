//! Channel breakout strategy.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use model::{MarketSnapshot, Signal};
use strategy_core::{Strategy, StrategyError};

/// Buys a close above the recent high, exits below the recent low.
pub struct BreakoutStrategy {
    lookback: usize,
    windows: Mutex<HashMap<String, VecDeque<Decimal>>>,
}

impl BreakoutStrategy {
    pub fn new(lookback: usize) -> Result<Self, StrategyError> {
        if lookback == 0 {
            return Err(StrategyError::InvalidConfig("lookback must be > 0".into()));
        }
        Ok(Self {
            lookback,
            windows: Mutex::new(HashMap::new()),
        })
    }
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        Self {
            lookback: 20,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &str {
        "Breakout"
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
        let price = snapshot.price;
        let mut windows = self.windows.lock();
        let window = windows.entry(snapshot.symbol.clone()).or_default();

        // Needs a full channel before it trades
        let signal = if window.len() < self.lookback {
            Signal::Hold
        } else {
            let high = window.iter().copied().max().unwrap_or(price);
            let low = window.iter().copied().min().unwrap_or(price);
            if price > high {
                Signal::Buy
            } else if price < low {
                Signal::Close
            } else {
                Signal::Hold
            }
        };

        window.push_back(price);
        if window.len() > self.lookback {
            window.pop_front();
        }

        if signal.is_actionable() {
            debug!(symbol = %snapshot.symbol, price = %price, signal = %signal, "breakout");
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(price: Decimal) -> MarketSnapshot {
        MarketSnapshot::new("BTCUSDT", price, dec!(1000))
    }

    #[test]
    fn test_holds_until_channel_full() {
        let strategy = BreakoutStrategy::new(3).unwrap();
        for price in [dec!(10), dec!(20), dec!(30)] {
            assert_eq!(strategy.analyze(&at(price)).unwrap(), Signal::Hold);
        }
    }

    #[test]
    fn test_breaks_high_and_low() {
        let strategy = BreakoutStrategy::new(3).unwrap();
        for price in [dec!(10), dec!(12), dec!(11)] {
            strategy.analyze(&at(price)).unwrap();
        }

        assert_eq!(strategy.analyze(&at(dec!(13))).unwrap(), Signal::Buy);
        assert_eq!(strategy.analyze(&at(dec!(12))).unwrap(), Signal::Hold);
        // channel is now [11, 13, 12]
        assert_eq!(strategy.analyze(&at(dec!(10))).unwrap(), Signal::Close);
    }

    #[test]
    fn test_zero_lookback_rejected() {
        assert!(BreakoutStrategy::new(0).is_err());
    }
}
