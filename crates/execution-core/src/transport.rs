//! Order transports.
//!
//! The executor owns retry and throttling; a transport makes exactly one
//! submission per call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rest_client::RestClient;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::TransportError;
use crate::order::Order;

/// One-shot order submission to an exchange.
#[async_trait]
pub trait OrderTransport: Send + Sync {
    /// Submit the order once and return the raw acknowledgement.
    async fn submit(&self, order: &Order) -> Result<Value, TransportError>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn OrderTransport>;

/// Posts orders as JSON to an exchange REST endpoint.
pub struct HttpOrderTransport {
    client: RestClient,
    path: String,
    headers: Vec<(String, String)>,
}

impl HttpOrderTransport {
    /// Create a transport that posts to `path` on the client's base URL.
    pub fn new(client: RestClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Builder method to add a header sent with every order.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl OrderTransport for HttpOrderTransport {
    async fn submit(&self, order: &Order) -> Result<Value, TransportError> {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        match self.client.post_json(&self.path, order, Some(&headers)).await {
            Ok(response) => Ok(response),
            // A 4xx means the exchange saw the order and refused it
            Err(e) if !e.is_transient() && e.status().is_some() => {
                debug!(client_order_id = %order.client_order_id, error = %e, "order refused");
                Err(TransportError::Rejected(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Counter for generating unique simulated order IDs.
static SIMULATED_ORDER_ID: AtomicU64 = AtomicU64::new(1_000_000);

/// Acknowledges every order locally as an immediate full fill.
#[derive(Debug, Default)]
pub struct PaperTransport;

impl PaperTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OrderTransport for PaperTransport {
    async fn submit(&self, order: &Order) -> Result<Value, TransportError> {
        let order_id = SIMULATED_ORDER_ID.fetch_add(1, Ordering::Relaxed);

        debug!(
            client_order_id = %order.client_order_id,
            order_id,
            "paper fill"
        );

        Ok(json!({
            "orderId": order_id,
            "clientOrderId": order.client_order_id,
            "symbol": order.symbol,
            "side": order.side.as_str(),
            "status": "FILLED",
            "executedQty": order.quantity.to_string(),
            "price": order.price.to_string(),
            "transactTime": chrono::Utc::now().timestamp_millis(),
            "paper": true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderSide;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_fill_echoes_order() {
        let transport = PaperTransport::new();
        let order = Order::new("BTCUSDT", OrderSide::Buy, dec!(0.5), dec!(50000));

        let ack = transport.submit(&order).await.unwrap();

        assert_eq!(ack["clientOrderId"], order.client_order_id.as_str());
        assert_eq!(ack["symbol"], "BTCUSDT");
        assert_eq!(ack["side"], "BUY");
        assert_eq!(ack["status"], "FILLED");
        assert_eq!(ack["executedQty"], "0.5");
    }

    #[tokio::test]
    async fn test_paper_order_ids_unique() {
        let transport = PaperTransport::new();
        let order = Order::new("BTCUSDT", OrderSide::Sell, dec!(1), dec!(100));

        let a = transport.submit(&order).await.unwrap();
        let b = transport.submit(&order).await.unwrap();
        assert_ne!(a["orderId"], b["orderId"]);
    }
}
