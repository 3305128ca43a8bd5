//! Execution error types.

use thiserror::Error;

/// Errors raised by an order transport for a single submission.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP layer failure.
    #[error("REST error: {0}")]
    Rest(#[from] rest_client::RestError),

    /// Exchange refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Transport is not reachable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Terminal outcome of an execution that produced no acknowledgement.
///
/// Exhausted retries mean the result is unknown: the order may or may not
/// have reached the exchange.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Every attempt failed.
    #[error("order submission failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of submissions made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },

    /// Shutdown was requested before an attempt succeeded.
    #[error("order submission cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of submissions made before cancellation.
        attempts: u32,
    },
}

impl ExecutionError {
    /// Returns true if the execution was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Number of submissions made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RetriesExhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}
