// Shared types for the bracket bot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire form used by the exchange
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Side that closes a position opened on `self`
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Lifecycle state of the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    #[default]
    WaitingForSignal,
    OrderPlaced,
    Timeout,
}

impl BotStatus {
    pub fn name(&self) -> &'static str {
        match self {
            BotStatus::WaitingForSignal => "WAITING_FOR_SIGNAL",
            BotStatus::OrderPlaced => "ORDER_PLACED",
            BotStatus::Timeout => "TIMEOUT",
        }
    }
}

/// An open (or just closed) bracket trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64, // mark price at entry
    pub side: Side,
    pub order_id: String, // market entry order
    pub quantity: f64,
    pub sl_price: Option<f64>,
    pub sl_order_id: Option<String>,
    pub tp_price: Option<f64>,
    pub tp_order_id: Option<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub success: bool,
}

impl Position {
    /// Both protective orders are known
    pub fn has_bracket(&self) -> bool {
        self.sl_order_id.is_some() && self.tp_order_id.is_some()
    }
}

/// Everything the bot needs to resume after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    pub status: BotStatus,
    pub symbol: String,
    pub cooldown_start: Option<DateTime<Utc>>,
    pub position: Option<Position>,
}

impl BotState {
    /// Initial state: waiting for a signal, nothing open
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            status: BotStatus::WaitingForSignal,
            symbol: symbol.into(),
            cooldown_start: None,
            position: None,
        }
    }
}

/// Exchange-reported order status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderState {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    Other(String),
}

impl OrderState {
    pub fn parse(status: &str) -> Self {
        match status {
            "NEW" => OrderState::New,
            "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
            "FILLED" => OrderState::Filled,
            "CANCELED" => OrderState::Canceled,
            "REJECTED" => OrderState::Rejected,
            "EXPIRED" => OrderState::Expired,
            other => OrderState::Other(other.to_string()),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, OrderState::Filled)
    }
}

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: i64, // ms since epoch
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_form() {
        let json = serde_json::to_string(&BotStatus::WaitingForSignal).unwrap();
        assert_eq!(json, "\"WAITING_FOR_SIGNAL\"");
        let parsed: BotStatus = serde_json::from_str("\"ORDER_PLACED\"").unwrap();
        assert_eq!(parsed, BotStatus::OrderPlaced);
        assert_eq!(BotStatus::Timeout.name(), "TIMEOUT");
    }

    #[test]
    fn test_side_text_form() {
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite().as_str(), "BUY");
    }

    #[test]
    fn test_order_state_parse() {
        assert!(OrderState::parse("FILLED").is_filled());
        assert_eq!(OrderState::parse("NEW"), OrderState::New);
        assert_eq!(
            OrderState::parse("EXPIRED_IN_MATCH"),
            OrderState::Other("EXPIRED_IN_MATCH".to_string())
        );
    }
}
