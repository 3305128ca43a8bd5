//! Strategy runner error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that stop the trading loop.
///
/// Risk denials and individual strategy failures are not errors; they are
/// reported through decisions and ensemble entries.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Consecutive order failures reached the configured threshold.
    #[error("{failures} consecutive order failures, last: {last_error}")]
    TransportFailuresExceeded {
        /// Number of consecutive failed executions.
        failures: u32,
        /// Error from the most recent execution.
        last_error: String,
    },

    /// Market data source failed for a symbol.
    #[error("market data unavailable for {symbol}: {reason}")]
    MarketData {
        /// Trading pair symbol.
        symbol: String,
        /// Source-specific failure description.
        reason: String,
    },

    /// No symbols to trade.
    #[error("no symbols configured")]
    NoSymbols,

    /// No strategies registered.
    #[error("no strategies registered")]
    NoStrategies,
}

/// Reasons why a risk check denied a trade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskRejection {
    /// Rolling drawdown over the symbol's history reached the limit.
    #[error("drawdown limit exceeded: current {current}, limit {limit}")]
    DrawdownLimitExceeded {
        /// Drawdown over the window, as a fraction of the peak.
        current: Decimal,
        /// Configured maximum drawdown.
        limit: Decimal,
    },

    /// Global drawdown tripped the circuit breaker on this call.
    #[error("circuit breaker triggered: global drawdown {drawdown}, limit {limit}")]
    CircuitBreakerTriggered {
        /// Global drawdown over the window.
        drawdown: Decimal,
        /// Configured circuit breaker drawdown.
        limit: Decimal,
    },

    /// Circuit breaker was tripped earlier and has not been reset.
    #[error("circuit breaker active")]
    CircuitBreakerActive,

    /// Capital committed across all open positions exceeds the limit.
    #[error("global exposure limit exceeded: current {current}, limit {limit}")]
    GlobalExposureExceeded {
        /// Sum of open position allocations.
        current: Decimal,
        /// Maximum allowed global exposure.
        limit: Decimal,
    },

    /// Capital committed to one symbol exceeds the limit.
    #[error("symbol exposure limit exceeded for {symbol}: current {current}, limit {limit}")]
    SymbolExposureExceeded {
        /// Trading pair symbol.
        symbol: String,
        /// Sum of open position allocations for the symbol.
        current: Decimal,
        /// Maximum allowed symbol exposure.
        limit: Decimal,
    },

    /// External veto hook rejected the trade.
    #[error("vetoed by risk tuner")]
    Vetoed,
}

impl RiskRejection {
    /// Returns true for the limits on committed capital.
    pub fn is_exposure(&self) -> bool {
        matches!(
            self,
            Self::GlobalExposureExceeded { .. } | Self::SymbolExposureExceeded { .. }
        )
    }
}
