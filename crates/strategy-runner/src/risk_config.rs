//! Risk management configuration.
//!
//! Thresholds are fractions (0.1 = 10%) except `sl_pct`/`tp_pct`, which are
//! percentages of price (0.5 = 0.5%).

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Price the trailing-stop floor is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopAnchor {
    /// The snapshot price the signal was generated at.
    #[default]
    SignalPrice,
    /// The expected fill price, when the caller supplies one.
    ExecutionPrice,
}

impl fmt::Display for StopAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignalPrice => write!(f, "signal"),
            Self::ExecutionPrice => write!(f, "execution"),
        }
    }
}

impl FromStr for StopAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "signal" | "signal_price" => Ok(Self::SignalPrice),
            "execution" | "execution_price" | "fill" => Ok(Self::ExecutionPrice),
            _ => Err(format!("invalid stop anchor '{s}', expected 'signal' or 'execution'")),
        }
    }
}

/// Configuration for the risk gate.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    // === Drawdown ===
    /// Rolling drawdown over the symbol history that blocks trading.
    pub max_drawdown: Decimal,

    /// Window for the per-symbol rolling drawdown.
    pub drawdown_window: usize,

    // === Stops ===
    /// Stop-loss distance, percent of price.
    pub sl_pct: Decimal,

    /// Take-profit distance, percent of price.
    pub tp_pct: Decimal,

    /// Trailing-stop floor distance, fraction of price. 0 disables.
    pub trailing_stop_pct: Decimal,

    /// Price the trailing floor is measured from.
    pub trailing_anchor: StopAnchor,

    // === Allocation ===
    /// Fraction of balance allocated to a new long.
    pub allocation_pct: Decimal,

    /// Number of trailing losses that triggers a scale-down.
    pub exposure_scale_window: usize,

    /// Multiplier applied to allocation after a losing streak.
    pub exposure_scale_factor: Decimal,

    // === Exposure ===
    /// Maximum committed capital across all symbols, fraction of balance.
    pub max_global_exposure: Decimal,

    /// Maximum committed capital per symbol, fraction of balance.
    pub max_symbol_exposure: Decimal,

    // === Circuit Breaker ===
    /// Global drawdown that trips the sticky circuit breaker.
    pub circuit_breaker_drawdown: Decimal,

    /// Window for the global drawdown.
    pub circuit_breaker_window: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown: dec!(0.1),
            drawdown_window: 10,

            sl_pct: dec!(0.5),
            tp_pct: dec!(1.0),
            trailing_stop_pct: dec!(0.05),
            trailing_anchor: StopAnchor::SignalPrice,

            allocation_pct: dec!(1.0),
            exposure_scale_window: 5,
            exposure_scale_factor: dec!(0.5),

            max_global_exposure: dec!(1.0),
            max_symbol_exposure: dec!(0.5),

            circuit_breaker_drawdown: dec!(0.2),
            circuit_breaker_window: 20,
        }
    }
}

impl RiskConfig {
    /// Create a new risk config with all default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter limits for first live runs.
    pub fn conservative() -> Self {
        Self {
            max_drawdown: dec!(0.05),
            allocation_pct: dec!(0.1),
            max_global_exposure: dec!(0.5),
            max_symbol_exposure: dec!(0.2),
            circuit_breaker_drawdown: dec!(0.1),
            trailing_stop_pct: dec!(0.02),
            ..Self::default()
        }
    }

    /// Apply `RISK_*` environment overrides on top of the defaults.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("RISK_MAX_DRAWDOWN", &mut config.max_drawdown);
        override_from_env("RISK_DRAWDOWN_WINDOW", &mut config.drawdown_window);
        override_from_env("RISK_SL_PCT", &mut config.sl_pct);
        override_from_env("RISK_TP_PCT", &mut config.tp_pct);
        override_from_env("RISK_TRAILING_STOP_PCT", &mut config.trailing_stop_pct);
        override_from_env("RISK_TRAILING_ANCHOR", &mut config.trailing_anchor);
        override_from_env("RISK_ALLOCATION_PCT", &mut config.allocation_pct);
        override_from_env("RISK_EXPOSURE_SCALE_WINDOW", &mut config.exposure_scale_window);
        override_from_env("RISK_EXPOSURE_SCALE_FACTOR", &mut config.exposure_scale_factor);
        override_from_env("RISK_MAX_GLOBAL_EXPOSURE", &mut config.max_global_exposure);
        override_from_env("RISK_MAX_SYMBOL_EXPOSURE", &mut config.max_symbol_exposure);
        override_from_env("RISK_CIRCUIT_BREAKER_DRAWDOWN", &mut config.circuit_breaker_drawdown);
        override_from_env("RISK_CIRCUIT_BREAKER_WINDOW", &mut config.circuit_breaker_window);
        config
    }

    /// Builder method to set max drawdown.
    pub fn with_max_drawdown(mut self, limit: Decimal) -> Self {
        self.max_drawdown = limit;
        self
    }

    /// Builder method to set stop-loss and take-profit percentages.
    pub fn with_sl_tp_pct(mut self, sl_pct: Decimal, tp_pct: Decimal) -> Self {
        self.sl_pct = sl_pct;
        self.tp_pct = tp_pct;
        self
    }

    /// Builder method to set the trailing stop.
    pub fn with_trailing_stop(mut self, pct: Decimal, anchor: StopAnchor) -> Self {
        self.trailing_stop_pct = pct;
        self.trailing_anchor = anchor;
        self
    }

    /// Builder method to set allocation fraction.
    pub fn with_allocation_pct(mut self, pct: Decimal) -> Self {
        self.allocation_pct = pct;
        self
    }

    /// Builder method to set losing-streak scaling.
    pub fn with_exposure_scaling(mut self, window: usize, factor: Decimal) -> Self {
        self.exposure_scale_window = window;
        self.exposure_scale_factor = factor;
        self
    }

    /// Builder method to set exposure limits.
    pub fn with_exposure_limits(mut self, global: Decimal, symbol: Decimal) -> Self {
        self.max_global_exposure = global;
        self.max_symbol_exposure = symbol;
        self
    }

    /// Builder method to set the circuit breaker drawdown.
    pub fn with_circuit_breaker_drawdown(mut self, limit: Decimal) -> Self {
        self.circuit_breaker_drawdown = limit;
        self
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    if let Some(value) = std::env::var(key).ok().and_then(|s| s.trim().parse().ok()) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RiskConfig::default();

        assert_eq!(config.max_drawdown, dec!(0.1));
        assert_eq!(config.sl_pct, dec!(0.5));
        assert_eq!(config.tp_pct, dec!(1.0));
        assert_eq!(config.allocation_pct, dec!(1.0));
        assert_eq!(config.max_global_exposure, dec!(1.0));
        assert_eq!(config.max_symbol_exposure, dec!(0.5));
        assert_eq!(config.exposure_scale_window, 5);
        assert_eq!(config.exposure_scale_factor, dec!(0.5));
        assert_eq!(config.circuit_breaker_drawdown, dec!(0.2));
        assert_eq!(config.trailing_stop_pct, dec!(0.05));
        assert_eq!(config.drawdown_window, 10);
        assert_eq!(config.circuit_breaker_window, 20);
        assert_eq!(config.trailing_anchor, StopAnchor::SignalPrice);
    }

    #[test]
    fn test_conservative_config() {
        let config = RiskConfig::conservative();

        assert!(config.max_drawdown < RiskConfig::default().max_drawdown);
        assert!(config.allocation_pct < RiskConfig::default().allocation_pct);
        assert_eq!(config.drawdown_window, 10);
    }

    #[test]
    fn test_builder_methods() {
        let config = RiskConfig::new()
            .with_max_drawdown(dec!(0.2))
            .with_sl_tp_pct(dec!(1), dec!(2))
            .with_trailing_stop(dec!(0), StopAnchor::ExecutionPrice)
            .with_allocation_pct(dec!(0.25))
            .with_exposure_scaling(3, dec!(0.1))
            .with_exposure_limits(dec!(2), dec!(1))
            .with_circuit_breaker_drawdown(dec!(0.3));

        assert_eq!(config.max_drawdown, dec!(0.2));
        assert_eq!(config.sl_pct, dec!(1));
        assert_eq!(config.tp_pct, dec!(2));
        assert_eq!(config.trailing_stop_pct, dec!(0));
        assert_eq!(config.trailing_anchor, StopAnchor::ExecutionPrice);
        assert_eq!(config.allocation_pct, dec!(0.25));
        assert_eq!(config.exposure_scale_window, 3);
        assert_eq!(config.max_symbol_exposure, dec!(1));
        assert_eq!(config.circuit_breaker_drawdown, dec!(0.3));
    }

    #[test]
    fn test_parse_stop_anchor() {
        assert_eq!("signal".parse::<StopAnchor>().unwrap(), StopAnchor::SignalPrice);
        assert_eq!("FILL".parse::<StopAnchor>().unwrap(), StopAnchor::ExecutionPrice);
        assert!("mid".parse::<StopAnchor>().is_err());
    }
}
