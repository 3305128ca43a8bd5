//! Canonical market and signal types shared across the decision core.
//!
//! Every strategy receives the same [`MarketSnapshot`] and answers with a
//! [`Signal`]; no component binds arguments by name.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only view of one symbol's market state for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Trading pair symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Account balance available for allocation.
    pub balance: Decimal,
    /// Trend strength, signed. Magnitude above 0.7 counts as trending.
    pub trend: f64,
    /// Normalized volatility.
    pub volatility: f64,
    /// Sentiment score, signed.
    pub sentiment: f64,
    /// Snapshot timestamp in milliseconds.
    pub timestamp_ms: i64,
}

impl MarketSnapshot {
    /// Create a snapshot with neutral indicators.
    pub fn new(symbol: impl Into<String>, price: Decimal, balance: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            balance,
            trend: 0.0,
            volatility: 0.0,
            sentiment: 0.0,
            timestamp_ms: 0,
        }
    }

    /// Builder method to set the regime indicators.
    pub fn with_indicators(mut self, trend: f64, volatility: f64, sentiment: f64) -> Self {
        self.trend = trend;
        self.volatility = volatility;
        self.sentiment = sentiment;
        self
    }

    /// Builder method to set the timestamp.
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }
}

/// Trading action proposed by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Close,
    Hold,
}

impl Signal {
    /// Returns true if the signal asks for an order.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Close => write!(f, "close"),
            Self::Hold => write!(f, "hold"),
        }
    }
}

impl FromStr for Signal {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" => Ok(Self::Buy),
            "sell" | "short" => Ok(Self::Sell),
            "close" | "exit" => Ok(Self::Close),
            "hold" | "none" | "" => Ok(Self::Hold),
            _ => Err(ParseSignalError(s.to_string())),
        }
    }
}

/// Error parsing a signal string.
#[derive(Debug, Clone)]
pub struct ParseSignalError(String);

impl fmt::Display for ParseSignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid signal '{}', expected 'buy', 'sell', 'close' or 'hold'",
            self.0
        )
    }
}

impl std::error::Error for ParseSignalError {}
