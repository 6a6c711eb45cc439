//! Recent market window for the signal source
//! Pulls the last N candles for the configured symbol and interval

use crate::error::ExchangeResult;
use crate::exchange::Exchange;
use crate::types::Candle;

/// Fixed-size window of recent candles, oldest first
#[derive(Debug, Clone, Default)]
pub struct MarketWindow {
    pub candles: Vec<Candle>,
}

impl MarketWindow {
    /// Fetch the latest `size` candles
    pub async fn fetch(
        exchange: &dyn Exchange,
        symbol: &str,
        interval: &str,
        size: usize,
    ) -> ExchangeResult<Self> {
        let mut candles = exchange.klines(symbol, interval, size).await?;
        candles.sort_by_key(|c| c.open_time);
        if candles.len() > size {
            candles.drain(..candles.len() - size);
        }
        Ok(Self { candles })
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Close of the most recent candle
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candle, MockExchange};

    #[tokio::test]
    async fn test_fetch_sorts_and_bounds_window() {
        let exchange = MockExchange::new(100.0);
        exchange.set_klines(vec![candle(3, 103.0), candle(1, 101.0), candle(2, 102.0)]);

        let window = MarketWindow::fetch(&exchange, "BTCUSDT", "15m", 2).await.unwrap();
        assert_eq!(window.candles.len(), 2);
        assert_eq!(window.candles[0].open_time, 2);
        assert_eq!(window.last_close(), Some(103.0));
    }

    #[tokio::test]
    async fn test_empty_window() {
        let exchange = MockExchange::new(100.0);
        let window = MarketWindow::fetch(&exchange, "BTCUSDT", "15m", 50).await.unwrap();
        assert!(window.is_empty());
        assert_eq!(window.last_close(), None);
    }
}
