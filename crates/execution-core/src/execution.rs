//! Throttled, bounded-retry order submission.
//!
//! The executor is the only component in the decision core that suspends:
//! it sleeps to honor the throttle spacing and awaits transport I/O. Both
//! waits observe the optional shutdown signal so a retry loop can be
//! abandoned cooperatively.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use common::Throttle;

use crate::error::ExecutionError;
use crate::order::Order;
use crate::transport::SharedTransport;

/// Configuration for the order executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of submission attempts per order.
    pub max_retries: u32,
    /// Minimum spacing between consecutive submissions.
    pub throttle_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            throttle_interval: Duration::from_secs(1),
        }
    }
}

impl ExecutorConfig {
    /// Load overrides from `EXECUTOR_MAX_RETRIES` and
    /// `EXECUTOR_THROTTLE_MS`, keeping defaults for anything unset or invalid.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: std::env::var("EXECUTOR_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            throttle_interval: std::env::var("EXECUTOR_THROTTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.throttle_interval),
        }
    }

    /// Builder method to set max retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder method to set throttle interval.
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }
}

/// Successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Raw acknowledgement from the transport.
    pub response: Value,
    /// Attempt number that succeeded (1-based).
    pub attempts: u32,
}

/// Submits orders through a transport with throttling and fixed-spacing retry.
pub struct OrderExecutor {
    transport: SharedTransport,
    config: ExecutorConfig,
    /// Held across the throttle wait so spacing is enforced between callers.
    throttle: Mutex<Throttle>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl OrderExecutor {
    /// Create an executor over the given transport.
    pub fn new(transport: SharedTransport, config: ExecutorConfig) -> Self {
        Self {
            throttle: Mutex::new(Throttle::new(config.throttle_interval)),
            transport,
            config,
            shutdown: None,
        }
    }

    /// Abort pending retries once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Submit an order using the configured retry count and spacing.
    pub async fn execute(&self, order: &Order) -> Result<Submission, ExecutionError> {
        self.execute_with(order, self.config.max_retries, self.config.throttle_interval)
            .await
    }

    /// Submit an order with explicit retry count and spacing.
    ///
    /// Every attempt, including the first, waits until `throttle_interval`
    /// has passed since the previous submission made by this executor.
    pub async fn execute_with(
        &self,
        order: &Order,
        max_retries: u32,
        throttle_interval: Duration,
    ) -> Result<Submission, ExecutionError> {
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=max_retries {
            let made = attempt - 1;
            if self.is_cancelled() {
                return Err(self.cancelled(order, made));
            }

            if !self.throttle_wait(throttle_interval).await {
                return Err(self.cancelled(order, made));
            }

            info!(
                client_order_id = %order.client_order_id,
                symbol = %order.symbol,
                side = %order.side,
                quantity = %order.quantity,
                attempt,
                max_retries,
                "submitting order"
            );

            match self.transport.submit(order).await {
                Ok(response) => {
                    info!(
                        client_order_id = %order.client_order_id,
                        attempt,
                        "order acknowledged"
                    );
                    return Ok(Submission {
                        response,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    warn!(
                        client_order_id = %order.client_order_id,
                        attempt,
                        max_retries,
                        error = %e,
                        "order submission failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        error!(
            client_order_id = %order.client_order_id,
            symbol = %order.symbol,
            attempts = max_retries,
            last_error = %last_error,
            "order submission retries exhausted"
        );

        Err(ExecutionError::RetriesExhausted {
            attempts: max_retries,
            last_error,
        })
    }

    /// Wait out the throttle and stamp the call. Returns false if cancelled.
    async fn throttle_wait(&self, interval: Duration) -> bool {
        let mut throttle = self.throttle.lock().await;
        throttle.set_interval(interval);

        let remaining = throttle.remaining();
        if !remaining.is_zero() && !self.sleep_unless_cancelled(remaining).await {
            return false;
        }

        throttle.mark();
        true
    }

    /// Sleep for `duration`. Returns false if shutdown fired first.
    async fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(duration).await;
            return true;
        };

        let mut shutdown = shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = wait_for_shutdown(&mut shutdown) => false,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    fn cancelled(&self, order: &Order, attempts: u32) -> ExecutionError {
        warn!(
            client_order_id = %order.client_order_id,
            attempts,
            "order submission cancelled"
        );
        ExecutionError::Cancelled { attempts }
    }
}

/// Resolves once the flag is true. Never resolves if the sender is gone.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
