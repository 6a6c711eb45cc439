use crate::types::{Candle, Side};

/// Verdict of a signal source for the current market window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    None,
}

impl Signal {
    /// Entry side, if the verdict calls for a trade
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::None => None,
        }
    }
}

/// Classifies a window of recent candles (oldest first)
pub trait SignalSource: Send + Sync {
    fn check(&self, window: &[Candle]) -> Signal;
}

impl<F> SignalSource for F
where
    F: Fn(&[Candle]) -> Signal + Send + Sync,
{
    fn check(&self, window: &[Candle]) -> Signal {
        self(window)
    }
}

/// Trades in the direction of the move across the window
#[derive(Debug, Clone, Copy)]
pub struct MomentumSignal {
    pub threshold: f64, // e.g. 0.002 = 0.2% move
}

impl MomentumSignal {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl SignalSource for MomentumSignal {
    fn check(&self, window: &[Candle]) -> Signal {
        let momentum = calculate_momentum(window);
        if momentum >= self.threshold {
            Signal::Buy
        } else if momentum <= -self.threshold {
            Signal::Sell
        } else {
            Signal::None
        }
    }
}

/// Relative change from the first to the last close of the window
pub fn calculate_momentum(window: &[Candle]) -> f64 {
    match (window.first(), window.last()) {
        (Some(oldest), Some(current)) if oldest.close > 0.0 => {
            (current.close - oldest.close) / oldest.close
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: i as i64 * 900_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_calculate_momentum() {
        assert!((calculate_momentum(&candles(&[100.0, 101.0, 102.0])) - 0.02).abs() < 1e-12);
        assert!((calculate_momentum(&candles(&[100.0, 99.0])) + 0.01).abs() < 1e-12);
        assert_eq!(calculate_momentum(&[]), 0.0);
        assert_eq!(calculate_momentum(&candles(&[0.0, 5.0])), 0.0);
    }

    #[test]
    fn test_momentum_signal() {
        let signal = MomentumSignal::new(0.005);
        assert_eq!(signal.check(&candles(&[100.0, 101.0])), Signal::Buy);
        assert_eq!(signal.check(&candles(&[100.0, 99.0])), Signal::Sell);
        assert_eq!(signal.check(&candles(&[100.0, 100.1])), Signal::None);
        assert_eq!(signal.check(&[]), Signal::None);
    }

    #[test]
    fn test_closure_source() {
        let always_sell = |_: &[Candle]| Signal::Sell;
        assert_eq!(always_sell.check(&[]), Signal::Sell);
        assert_eq!(Signal::Sell.side(), Some(Side::Sell));
        assert_eq!(Signal::None.side(), None);
    }
}
