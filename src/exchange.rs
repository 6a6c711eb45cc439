//! The exchange seam.
//!
//! The bot only ever talks to the exchange through [`Exchange`], and only
//! sees the handful of typed fields it acts on.

use async_trait::async_trait;

use crate::error::ExchangeResult;
use crate::types::{Candle, OrderState, Side};

/// What kind of order to submit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    /// Opens the position
    Market { quantity: f64 },
    /// Flattens a position without ever flipping it
    ReduceOnlyMarket { quantity: f64 },
    /// Closes the whole position when mark price crosses `stop_price` adversely
    StopMarket { stop_price: f64 },
    /// Closes the whole position when mark price crosses `stop_price` favourably
    TakeProfitMarket { stop_price: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
}

impl OrderRequest {
    pub fn new(symbol: impl Into<String>, side: Side, kind: OrderKind) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind,
        }
    }
}

/// Acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
}

/// Result of a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// Order was already filled, cancelled or unknown
    AlreadyResolved,
}

#[async_trait]
pub trait Exchange: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> ExchangeResult<OrderAck>;

    async fn get_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderState>;

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<CancelOutcome>;

    async fn mark_price(&self, symbol: &str) -> ExchangeResult<f64>;

    /// Most recent `limit` candles, oldest first
    async fn klines(&self, symbol: &str, interval: &str, limit: usize)
        -> ExchangeResult<Vec<Candle>>;
}
