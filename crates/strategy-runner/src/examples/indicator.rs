//! Indicator threshold strategies.
//!
//! Each reads one regime indicator off the snapshot and tests it against a
//! buy threshold and an exit threshold. Most canonical strategy families are
//! a preset of this one type.

use tracing::debug;

use model::{MarketSnapshot, Signal};
use strategy_core::{Strategy, StrategyError};

/// Snapshot field a threshold strategy watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Trend,
    Volatility,
    Sentiment,
}

impl Indicator {
    fn read(&self, snapshot: &MarketSnapshot) -> f64 {
        match self {
            Self::Trend => snapshot.trend,
            Self::Volatility => snapshot.volatility,
            Self::Sentiment => snapshot.sentiment,
        }
    }
}

/// One side of a threshold test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Above(f64),
    Below(f64),
}

impl Threshold {
    fn hit(&self, value: f64) -> bool {
        match *self {
            Self::Above(level) => value > level,
            Self::Below(level) => value < level,
        }
    }
}

/// Configuration for the indicator strategy.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    /// Indicator to watch.
    pub indicator: Indicator,
    /// Condition that opens a long.
    pub buy: Threshold,
    /// Condition that exits. Checked only when `buy` does not hold.
    pub exit: Threshold,
}

impl IndicatorConfig {
    pub fn new(indicator: Indicator, buy: Threshold, exit: Threshold) -> Self {
        Self {
            indicator,
            buy,
            exit,
        }
    }
}

/// Stateless threshold strategy over one indicator.
pub struct IndicatorStrategy {
    name: String,
    config: IndicatorConfig,
}

impl IndicatorStrategy {
    pub fn new(name: impl Into<String>, config: IndicatorConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Rides strong trends.
    pub fn trend_following() -> Self {
        Self::new(
            "TrendFollowing",
            IndicatorConfig::new(
                Indicator::Trend,
                Threshold::Above(0.7),
                Threshold::Below(-0.2),
            ),
        )
    }

    /// Enters earlier than trend following and exits as soon as it fades.
    pub fn momentum() -> Self {
        Self::new(
            "Momentum",
            IndicatorConfig::new(
                Indicator::Trend,
                Threshold::Above(0.4),
                Threshold::Below(0.1),
            ),
        )
    }

    /// Buys dips, sells rallies.
    pub fn mean_reversion() -> Self {
        Self::new(
            "MeanReversion",
            IndicatorConfig::new(
                Indicator::Trend,
                Threshold::Below(-0.3),
                Threshold::Above(0.3),
            ),
        )
    }

    /// Follows strong positive sentiment.
    pub fn sentiment() -> Self {
        Self::new(
            "Sentiment",
            IndicatorConfig::new(
                Indicator::Sentiment,
                Threshold::Above(0.7),
                Threshold::Below(-0.3),
            ),
        )
    }

    /// Quotes only in calm markets, steps aside when volatility picks up.
    pub fn market_making() -> Self {
        Self::new(
            "MarketMaking",
            IndicatorConfig::new(
                Indicator::Volatility,
                Threshold::Below(0.2),
                Threshold::Above(0.4),
            ),
        )
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }
}

impl Strategy for IndicatorStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
        let value = self.config.indicator.read(snapshot);
        if !value.is_finite() {
            return Err(StrategyError::NoMarketData(format!(
                "{:?} for {}",
                self.config.indicator, snapshot.symbol
            )));
        }

        let signal = if self.config.buy.hit(value) {
            Signal::Buy
        } else if self.config.exit.hit(value) {
            Signal::Close
        } else {
            Signal::Hold
        };

        debug!(
            strategy = %self.name,
            symbol = %snapshot.symbol,
            value,
            signal = %signal,
            "indicator evaluated"
        );
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(trend: f64, volatility: f64, sentiment: f64) -> MarketSnapshot {
        MarketSnapshot::new("BTCUSDT", dec!(50000), dec!(1000))
            .with_indicators(trend, volatility, sentiment)
    }

    #[test]
    fn test_trend_following_signals() {
        let strategy = IndicatorStrategy::trend_following();

        assert_eq!(strategy.analyze(&snapshot(0.8, 0.6, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(strategy.analyze(&snapshot(0.3, 0.6, 0.0)).unwrap(), Signal::Hold);
        assert_eq!(strategy.analyze(&snapshot(-0.5, 0.6, 0.0)).unwrap(), Signal::Close);
    }

    #[test]
    fn test_mean_reversion_buys_dips() {
        let strategy = IndicatorStrategy::mean_reversion();

        assert_eq!(strategy.analyze(&snapshot(-0.5, 0.3, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(strategy.analyze(&snapshot(0.0, 0.3, 0.0)).unwrap(), Signal::Hold);
        assert_eq!(strategy.analyze(&snapshot(0.5, 0.3, 0.0)).unwrap(), Signal::Close);
    }

    #[test]
    fn test_market_making_in_calm_markets() {
        let strategy = IndicatorStrategy::market_making();

        assert_eq!(strategy.analyze(&snapshot(0.0, 0.1, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(strategy.analyze(&snapshot(0.0, 0.3, 0.0)).unwrap(), Signal::Hold);
        assert_eq!(strategy.analyze(&snapshot(0.0, 0.5, 0.0)).unwrap(), Signal::Close);
    }

    #[test]
    fn test_sentiment_names_and_thresholds() {
        let strategy = IndicatorStrategy::sentiment();
        assert_eq!(strategy.name(), "Sentiment");
        assert_eq!(strategy.analyze(&snapshot(0.0, 0.3, 0.9)).unwrap(), Signal::Buy);
    }

    #[test]
    fn test_non_finite_indicator_is_an_error() {
        let strategy = IndicatorStrategy::momentum();
        let result = strategy.analyze(&snapshot(f64::NAN, 0.3, 0.0));
        assert!(matches!(result, Err(StrategyError::NoMarketData(_))));
    }
}
