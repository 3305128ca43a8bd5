//! Position bookkeeping.
//!
//! Holds at most one live position per symbol plus an append-only list of
//! closed positions.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::order::OrderSide;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// No live position.
    #[default]
    None,
    Long,
    Short,
}

impl PositionSide {
    /// Returns true if there is no live position.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<OrderSide> for PositionSide {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Long,
            OrderSide::Sell => Self::Short,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// A position in a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Trading pair symbol.
    pub symbol: String,
    /// Position direction.
    pub side: PositionSide,
    /// Position size in base asset.
    pub amount: Decimal,
    /// Price at which the position was opened. Never changes after creation.
    pub entry_price: Decimal,
    /// Open timestamp in milliseconds.
    pub open_timestamp_ms: i64,
    /// Close timestamp in milliseconds, set once the position is closed.
    pub close_timestamp_ms: Option<i64>,
    /// Last update timestamp in milliseconds.
    pub last_update_ms: i64,
}

impl Position {
    /// Capital committed to the position (amount * entry price).
    pub fn allocation(&self) -> Decimal {
        self.amount.abs() * self.entry_price
    }

    /// Returns true once the position has been closed.
    pub fn is_closed(&self) -> bool {
        self.close_timestamp_ms.is_some()
    }

    /// PnL if the position were exited at `exit_price`.
    pub fn pnl_at(&self, exit_price: Decimal) -> Decimal {
        match self.side {
            PositionSide::Long => (exit_price - self.entry_price) * self.amount,
            PositionSide::Short => (self.entry_price - exit_price) * self.amount,
            PositionSide::None => Decimal::ZERO,
        }
    }
}

/// Thread-safe position store across all symbols.
///
/// Live positions are sharded per symbol so concurrent ticks on different
/// symbols never contend.
pub struct PositionManager {
    positions: DashMap<String, Position>,
    closed: RwLock<Vec<Position>>,
}

impl PositionManager {
    /// Create an empty position manager.
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            closed: RwLock::new(Vec::new()),
        }
    }

    /// Open a position, or update side and amount of the existing one.
    ///
    /// The entry price is only written on creation.
    pub fn open_or_update(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        timestamp_ms: i64,
    ) {
        match self.positions.entry(symbol.to_string()) {
            Entry::Occupied(mut entry) => {
                let position = entry.get_mut();
                position.side = side.into();
                position.amount = amount;
                position.last_update_ms = timestamp_ms;
                debug!(
                    symbol = %symbol,
                    side = %position.side,
                    amount = %amount,
                    "position updated"
                );
            }
            Entry::Vacant(entry) => {
                let position = Position {
                    symbol: symbol.to_string(),
                    side: side.into(),
                    amount,
                    entry_price: price,
                    open_timestamp_ms: timestamp_ms,
                    close_timestamp_ms: None,
                    last_update_ms: timestamp_ms,
                };
                info!(
                    symbol = %symbol,
                    side = %position.side,
                    amount = %amount,
                    entry_price = %price,
                    "position opened"
                );
                entry.insert(position);
            }
        }
    }

    /// Close the live position for a symbol.
    ///
    /// Returns the closed position, or `None` if there was nothing to close.
    pub fn close(&self, symbol: &str, timestamp_ms: i64) -> Option<Position> {
        let (_, mut position) = self.positions.remove(symbol)?;
        position.close_timestamp_ms = Some(timestamp_ms);
        position.last_update_ms = timestamp_ms;

        info!(
            symbol = %symbol,
            side = %position.side,
            amount = %position.amount,
            entry_price = %position.entry_price,
            "position closed"
        );

        self.closed.write().push(position.clone());
        Some(position)
    }

    /// Side of the live position for a symbol.
    pub fn status(&self, symbol: &str) -> PositionSide {
        self.positions
            .get(symbol)
            .map(|p| p.side)
            .unwrap_or_default()
    }

    /// Get the live position for a symbol.
    pub fn get_position(&self, symbol: &str) -> Option<Position> {
        self.positions.get(symbol).map(|p| p.clone())
    }

    /// Snapshot of all live positions.
    pub fn open_positions(&self) -> Vec<Position> {
        self.positions.iter().map(|p| p.clone()).collect()
    }

    /// Snapshot of closed positions in close order.
    pub fn closed_positions(&self) -> Vec<Position> {
        self.closed.read().clone()
    }

    /// Number of live positions.
    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Sum of capital committed across live positions.
    pub fn total_allocation(&self) -> Decimal {
        self.positions.iter().map(|p| p.allocation()).sum()
    }
}

impl Default for PositionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared position manager type.
pub type SharedPositionManager = Arc<PositionManager>;

/// Create a new shared position manager.
pub fn create_position_manager() -> SharedPositionManager {
    Arc::new(PositionManager::new())
}
