//! Bracket levels
//!
//! Stop-loss and take-profit trigger prices as fixed fractional offsets
//! from the mark price at entry. The stop always sits on the adverse side
//! and the target on the favourable side of the entry direction.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Side;

/// Offsets and rounding applied to every new bracket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketParams {
    pub stop_fraction: f64,   // e.g. 0.0005 = 0.05% adverse move
    pub target_fraction: f64, // e.g. 0.0008 = 0.08% favourable move
    pub price_precision: u32, // decimal places accepted by the instrument
}

/// Trigger prices for one bracket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketLevels {
    pub stop_price: f64,
    pub target_price: f64,
}

impl BracketLevels {
    pub fn compute(side: Side, mark_price: f64, params: &BracketParams) -> Self {
        let (stop, target) = match side {
            Side::Buy => (
                mark_price * (1.0 - params.stop_fraction),
                mark_price * (1.0 + params.target_fraction),
            ),
            Side::Sell => (
                mark_price * (1.0 + params.stop_fraction),
                mark_price * (1.0 - params.target_fraction),
            ),
        };

        Self {
            stop_price: round_price(stop, params.price_precision),
            target_price: round_price(target, params.price_precision),
        }
    }
}

/// Round half away from zero to `precision` decimal places.
///
/// Rounds the shortest decimal form of `price`, not its exact binary value,
/// so a product like `6.25 * 0.9995` lands on the midpoint and rounds up.
pub fn round_price(price: f64, precision: u32) -> f64 {
    Decimal::from_f64(price)
        .map(|d| d.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    const PARAMS: BracketParams = BracketParams {
        stop_fraction: 0.0005,
        target_fraction: 0.0008,
        price_precision: 2,
    };

    #[test]
    fn test_buy_levels() {
        let levels = BracketLevels::compute(Side::Buy, 100.0, &PARAMS);
        assert!(approx(levels.stop_price, 99.95));
        assert!(approx(levels.target_price, 100.08));
    }

    #[test]
    fn test_sell_levels_mirror_buy() {
        let levels = BracketLevels::compute(Side::Sell, 100.0, &PARAMS);
        assert!(approx(levels.stop_price, 100.05));
        assert!(approx(levels.target_price, 99.92));
    }

    #[test]
    fn test_levels_at_realistic_mark() {
        let levels = BracketLevels::compute(Side::Buy, 64_123.47, &PARAMS);
        assert!(approx(levels.stop_price, 64_091.41));
        assert!(approx(levels.target_price, 64_174.77));
    }

    #[test]
    fn test_round_price() {
        assert!(approx(round_price(1.23456, 2), 1.23));
        assert!(approx(round_price(1.2367, 2), 1.24));
        assert!(approx(round_price(1.2345, 0), 1.0));
        assert!(approx(round_price(0.123456, 4), 0.1235));
    }
}
