//! Minimal REST client used by the HTTP order transport.
//!
//! Wraps `reqwest` with JSON request/response bodies and maps every
//! failure into [`RestError`], including 429 rate limiting with the
//! server's `Retry-After` hint.
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_client::RestClient;
//! use serde_json::Value;
//!
//! let client = RestClient::with_default_timeout("https://api.exchange.example")?;
//! let ack: Value = client.post_json("/v1/order", &order, None).await?;
//! ```

mod client;
mod error;

pub use client::RestClient;
pub use error::RestError;
