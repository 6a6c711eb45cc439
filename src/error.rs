//! Error types for the exchange client, configuration, persistence and
//! the bracket protocol.

use std::fmt;

use thiserror::Error;

/// Result type for exchange calls
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Failures talking to the exchange
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Timestamp error: {0}")]
    Timestamp(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ExchangeError {
    /// Worth trying again on the next tick
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_)
                | ExchangeError::Timeout(_)
                | ExchangeError::RateLimited
                | ExchangeError::Timestamp(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

/// Bad or missing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Failures writing the state file
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of a failed bracket placement
#[derive(Debug, Error)]
pub enum BracketError {
    /// Entry order never went through, nothing to undo
    #[error("entry order failed: {0}")]
    Entry(#[source] ExchangeError),

    /// Entry filled but the bracket could not be completed; the entry was flattened
    #[error("bracket incomplete after entry {entry_order_id}, position flattened: {cause}")]
    RolledBack {
        entry_order_id: String,
        cause: ExchangeError,
    },

    /// Entry filled, bracket incomplete, and undoing it failed too
    #[error(
        "bracket incomplete after entry {entry_order_id} and rollback failed: {cause}; {rollback}"
    )]
    RollbackFailed {
        entry_order_id: String,
        cause: ExchangeError,
        rollback: RollbackError,
    },
}

/// Steps of a rollback that failed. At least one field is set.
#[derive(Debug, Default)]
pub struct RollbackError {
    /// Cancelling the stop-loss that was already placed
    pub cancel: Option<ExchangeError>,
    /// Flattening the entry with a reduce-only market order
    pub flatten: Option<ExchangeError>,
}

impl RollbackError {
    pub fn is_empty(&self) -> bool {
        self.cancel.is_none() && self.flatten.is_none()
    }
}

impl fmt::Display for RollbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.cancel, &self.flatten) {
            (Some(cancel), Some(flatten)) => {
                write!(f, "stop-loss cancel: {}; flatten: {}", cancel, flatten)
            }
            (Some(cancel), None) => write!(f, "stop-loss cancel: {}", cancel),
            (None, Some(flatten)) => write!(f, "flatten: {}", flatten),
            (None, None) => write!(f, "no rollback step failed"),
        }
    }
}

impl std::error::Error for RollbackError {}
