//! Strategy error types.

use thiserror::Error;

/// Errors a strategy may raise from `analyze`.
///
/// These never abort routing; the router records them next to the
/// strategy's allocation and moves on.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot is missing data the strategy needs.
    #[error("market data not available for {0}")]
    NoMarketData(String),

    /// Model or indicator could not produce a value.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// Internal strategy error.
    #[error("internal error: {0}")]
    Internal(String),
}
