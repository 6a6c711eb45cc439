//! Single-symbol bracket-order trading bot for Binance USDⓈ-M futures.
//!
//! On a signal the bot opens a fixed-size position, attaches a stop-loss and
//! a take-profit, waits for one of them to fill, reports the outcome through
//! [`hooks::PositionHooks`], sits out a cooldown and starts over. Its state
//! is saved after every tick so a restarted process picks up the same orders.

pub mod binance;
pub mod bot;
pub mod config;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod hooks;
pub mod market_data;
pub mod persistence;
pub mod risk;
pub mod signal;
pub mod types;

#[cfg(test)]
mod testing;

pub use bot::TradingBot;
pub use config::BotConfig;
pub use types::{BotState, BotStatus, Position, Side};
