//! Strategy trait definition.

use std::sync::Arc;

use model::{MarketSnapshot, Signal};

use crate::error::StrategyError;

/// Core trait for signal generators.
///
/// Implementations must be cheap to call at tick frequency and must not
/// block; the router invokes `analyze` synchronously for every strategy
/// that received a nonzero allocation.
///
/// # Example
///
/// ```rust,ignore
/// use strategy_core::{MarketSnapshot, Signal, Strategy, StrategyError};
///
/// struct Momentum {
///     threshold: f64,
/// }
///
/// impl Strategy for Momentum {
///     fn name(&self) -> &str {
///         "Momentum"
///     }
///
///     fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
///         if snapshot.trend > self.threshold {
///             Ok(Signal::Buy)
///         } else if snapshot.trend < -self.threshold {
///             Ok(Signal::Sell)
///         } else {
///             Ok(Signal::Hold)
///         }
///     }
/// }
/// ```
pub trait Strategy: Send + Sync {
    /// Returns the unique name of this strategy.
    ///
    /// Names double as keys for allocation splits and performance stats.
    fn name(&self) -> &str;

    /// Produce a signal for the given snapshot.
    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError>;
}

/// A shareable strategy handle.
pub type SharedStrategy = Arc<dyn Strategy>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Fixed(&'static str, Signal);

    impl Strategy for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn analyze(&self, _snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
            Ok(self.1)
        }
    }

    struct Broken;

    impl Strategy for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
            Err(StrategyError::NoMarketData(snapshot.symbol.clone()))
        }
    }

    #[test]
    fn test_dyn_dispatch() {
        let strategies: Vec<SharedStrategy> =
            vec![Arc::new(Fixed("A", Signal::Buy)), Arc::new(Broken)];
        let snapshot = MarketSnapshot::new("BTCUSDT", dec!(100), dec!(1000));

        assert_eq!(strategies[0].name(), "A");
        assert_eq!(strategies[0].analyze(&snapshot).unwrap(), Signal::Buy);

        let err = strategies[1].analyze(&snapshot).unwrap_err();
        assert_eq!(err.to_string(), "market data not available for BTCUSDT");
    }
}
