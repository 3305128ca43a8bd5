//! Errors returned by [`RestClient`](crate::RestClient).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    /// Non-success status. `body` is the raw response text.
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// 429 from the server.
    #[error("rate limited for {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("request timed out")]
    Timeout,

    #[error("network: {0}")]
    Network(String),

    /// Response body was not the expected JSON.
    #[error("decode: {0}")]
    Decode(String),

    #[error("client build: {0}")]
    Build(String),
}

impl RestError {
    /// HTTP status behind this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// True when the order may not have reached the exchange or the
    /// exchange failed on its side, so a resubmission can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Build(_) => false,
        }
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            _ if err.is_timeout() => Self::Timeout,
            _ if err.is_decode() => Self::Decode(err.to_string()),
            Some(status) => Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let bad_gateway = RestError::Status {
            status: 502,
            body: String::new(),
        };
        let bad_qty = RestError::Status {
            status: 400,
            body: "invalid quantity".into(),
        };

        assert!(bad_gateway.is_transient());
        assert!(!bad_qty.is_transient());
        assert_eq!(bad_qty.status(), Some(400));
        assert!(RestError::Timeout.is_transient());
        assert!(!RestError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_rate_limit_reports_429() {
        let err = RestError::RateLimited {
            retry_after: Duration::from_secs(2),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "rate limited for 2s");
        assert_eq!(RestError::Network("reset".into()).status(), None);
    }
}
