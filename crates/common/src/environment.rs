//! Trading mode configuration.
//!
//! Selects between simulated order acknowledgement and a live exchange
//! transport.

use std::fmt;
use std::str::FromStr;

/// Trading mode (paper or live).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradingMode {
    /// Orders are acknowledged locally, nothing leaves the process.
    #[default]
    Paper,
    /// Orders are sent to the exchange (real money).
    Live,
}

impl TradingMode {
    /// Returns true if orders are sent to the exchange.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Returns true if orders are simulated.
    pub fn is_paper(&self) -> bool {
        matches!(self, Self::Paper)
    }

    /// Load mode from `TRADING_MODE` env var.
    ///
    /// Returns `Paper` if not set or invalid.
    pub fn from_env() -> Self {
        std::env::var("TRADING_MODE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl FromStr for TradingMode {
    type Err = ParseTradingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paper" | "dry-run" | "dry_run" | "simulated" => Ok(Self::Paper),
            "live" | "real" | "production" => Ok(Self::Live),
            _ => Err(ParseTradingModeError(s.to_string())),
        }
    }
}

/// Error parsing trading mode string.
#[derive(Debug, Clone)]
pub struct ParseTradingModeError(String);

impl fmt::Display for ParseTradingModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid trading mode '{}', expected 'paper' or 'live'",
            self.0
        )
    }
}

impl std::error::Error for ParseTradingModeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paper() {
        assert_eq!("paper".parse::<TradingMode>().unwrap(), TradingMode::Paper);
        assert_eq!("DRY-RUN".parse::<TradingMode>().unwrap(), TradingMode::Paper);
    }

    #[test]
    fn test_parse_live() {
        assert_eq!("live".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert_eq!("Production".parse::<TradingMode>().unwrap(), TradingMode::Live);
    }

    #[test]
    fn test_parse_invalid() {
        let err = "yolo".parse::<TradingMode>().unwrap_err();
        assert!(err.to_string().contains("yolo"));
    }

    #[test]
    fn test_default_is_paper() {
        let mode = TradingMode::default();
        assert!(mode.is_paper());
        assert!(!mode.is_live());
    }

    #[test]
    fn test_display_roundtrip() {
        for mode in [TradingMode::Paper, TradingMode::Live] {
            assert_eq!(mode.to_string().parse::<TradingMode>().unwrap(), mode);
        }
    }
}
