//! Core strategy trait for the trading bot.
//!
//! Every signal generator implements [`Strategy`] and is handed the same
//! canonical [`MarketSnapshot`]. Strategies are injected into the router
//! explicitly; there is no global registry.
//!
//! # Example Strategy
//!
//! ```rust,ignore
//! use strategy_core::{MarketSnapshot, Signal, Strategy, StrategyError};
//!
//! struct AlwaysHold;
//!
//! impl Strategy for AlwaysHold {
//!     fn name(&self) -> &str {
//!         "AlwaysHold"
//!     }
//!
//!     fn analyze(&self, _snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
//!         Ok(Signal::Hold)
//!     }
//! }
//! ```

mod error;
mod strategy;

pub use error::StrategyError;
pub use strategy::{SharedStrategy, Strategy};

// Re-export commonly used types from dependencies for convenience
pub use model::{MarketSnapshot, Signal};
