//! Decision and equity events emitted by the trading loop.
//!
//! Sinks only observe; storing events is left to whoever implements
//! [`EventSink`].

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use model::Signal;

use crate::router::Regime;

/// One risk-gated decision for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionEvent {
    pub timestamp_ms: i64,
    pub symbol: String,
    pub regime: Regime,
    pub strategy: String,
    pub signal: Signal,
    pub price: Decimal,
    pub allow: bool,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub allocation: Decimal,
    /// Rejection messages, empty when allowed.
    pub reasons: Vec<String>,
}

/// Equity observation, emitted when a position closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityEvent {
    pub timestamp_ms: i64,
    pub symbol: String,
    pub strategy: String,
    pub realized_pnl: Decimal,
    pub equity: Decimal,
}

/// Receiver of loop events.
pub trait EventSink: Send + Sync {
    fn on_decision(&self, event: &DecisionEvent);

    fn on_equity(&self, event: &EquityEvent);
}

/// Logs events as JSON through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    fn emit<T: Serialize>(kind: &str, event: &T) {
        match serde_json::to_string(event) {
            Ok(json) => info!(target: "events", kind, event = %json),
            Err(e) => warn!(kind, error = %e, "failed to serialize event"),
        }
    }
}

impl EventSink for TracingEventSink {
    fn on_decision(&self, event: &DecisionEvent) {
        Self::emit("decision", event);
    }

    fn on_equity(&self, event: &EquityEvent) {
        Self::emit("equity", event);
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    decisions: Mutex<Vec<DecisionEvent>>,
    equity: Mutex<Vec<EquityEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> Vec<DecisionEvent> {
        self.decisions.lock().clone()
    }

    pub fn equity(&self) -> Vec<EquityEvent> {
        self.equity.lock().clone()
    }
}

impl EventSink for MemoryEventSink {
    fn on_decision(&self, event: &DecisionEvent) {
        self.decisions.lock().push(event.clone());
    }

    fn on_equity(&self, event: &EquityEvent) {
        self.equity.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn decision() -> DecisionEvent {
        DecisionEvent {
            timestamp_ms: 1_700_000_000_000,
            symbol: "BTCUSDT".into(),
            regime: Regime::Trend,
            strategy: "TrendFollowing".into(),
            signal: Signal::Buy,
            price: dec!(100),
            allow: false,
            stop_loss: dec!(99.5),
            take_profit: dec!(101),
            allocation: dec!(1000),
            reasons: vec!["circuit breaker active".into()],
        }
    }

    #[test]
    fn test_decision_serializes() {
        let json = serde_json::to_value(decision()).unwrap();

        assert_eq!(json["symbol"], "BTCUSDT");
        assert_eq!(json["regime"], "trend");
        assert_eq!(json["signal"], "buy");
        assert_eq!(json["allow"], false);
        assert_eq!(json["reasons"][0], "circuit breaker active");
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemoryEventSink::new();
        sink.on_decision(&decision());
        sink.on_equity(&EquityEvent {
            timestamp_ms: 0,
            symbol: "BTCUSDT".into(),
            strategy: "TrendFollowing".into(),
            realized_pnl: dec!(-5),
            equity: dec!(995),
        });

        assert_eq!(sink.decisions().len(), 1);
        assert_eq!(sink.equity()[0].equity, dec!(995));
    }
}
