//! Order request type.

use std::fmt;

use model::Signal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that opens a position for the given signal.
    ///
    /// `Close` and `Hold` do not open anything.
    pub fn opening(signal: Signal) -> Option<Self> {
        match signal {
            Signal::Buy => Some(Self::Buy),
            Signal::Sell => Some(Self::Sell),
            Signal::Close | Signal::Hold => None,
        }
    }

    /// The opposite side, used to flatten a position.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Exchange string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a unique client order ID.
///
/// Format: `{prefix}_{uuid}` without dashes.
pub fn generate_client_order_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().as_simple())
}

/// Order submitted to the exchange transport.
///
/// Transient: the core never persists orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Client-generated order ID.
    pub client_order_id: String,
    /// Trading pair symbol.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Order quantity in base asset.
    pub quantity: Decimal,
    /// Reference price.
    pub price: Decimal,
    /// Protective stop price.
    pub stop_loss: Decimal,
    /// Profit target price.
    pub take_profit: Decimal,
    /// Creation timestamp in milliseconds.
    pub created_at_ms: i64,
}

impl Order {
    /// Create an order with a fresh client order ID and no stops.
    pub fn new(symbol: impl Into<String>, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self {
            client_order_id: generate_client_order_id("BOT"),
            symbol: symbol.into(),
            side,
            quantity,
            price,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Builder method to set stop-loss and take-profit prices.
    pub fn with_stops(mut self, stop_loss: Decimal, take_profit: Decimal) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Notional value (quantity * price).
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_client_order_id_format() {
        let id = generate_client_order_id("BOT");
        assert!(id.starts_with("BOT_"));
        assert_eq!(id.len(), 4 + 32);
        assert_ne!(id, generate_client_order_id("BOT"));
    }

    #[test]
    fn test_opening_side() {
        assert_eq!(OrderSide::opening(Signal::Buy), Some(OrderSide::Buy));
        assert_eq!(OrderSide::opening(Signal::Sell), Some(OrderSide::Sell));
        assert_eq!(OrderSide::opening(Signal::Close), None);
        assert_eq!(OrderSide::opening(Signal::Hold), None);
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let order = Order::new("BTCUSDT", OrderSide::Buy, dec!(10), dec!(100))
            .with_stops(dec!(99.5), dec!(101));
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["symbol"], "BTCUSDT");
        assert_eq!(json["side"], "BUY");
        assert_eq!(json["stopLoss"], "99.5");
        assert_eq!(order.notional(), dec!(1000));
    }
}
