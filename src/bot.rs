//! Position lifecycle state machine.
//!
//! `WAITING_FOR_SIGNAL -> ORDER_PLACED -> TIMEOUT -> WAITING_FOR_SIGNAL`, one
//! tick at a time. Every tick evaluates the current status, runs at most one
//! side-effecting action, then persists the whole [`BotState`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::exchange::Exchange;
use crate::execution::{cancel_sibling, place_bracket, poll_bracket, Resolution};
use crate::hooks::{notify, PositionHooks};
use crate::market_data::MarketWindow;
use crate::persistence::StateStore;
use crate::risk::BracketParams;
use crate::signal::SignalSource;
use crate::types::{BotState, BotStatus};

pub struct TradingBot {
    exchange: Arc<dyn Exchange>,
    signal: Box<dyn SignalSource>,
    hooks: Box<dyn PositionHooks>,
    store: StateStore,
    state: BotState,
    quantity: f64,
    interval: String,
    window_size: usize,
    bracket: BracketParams,
    cooldown: Duration,
    polling_interval: Duration,
}

impl TradingBot {
    /// Build a bot and restore whatever state was saved for `config.symbol`
    pub fn new(
        config: &BotConfig,
        exchange: Arc<dyn Exchange>,
        signal: impl SignalSource + 'static,
        hooks: impl PositionHooks + 'static,
    ) -> Self {
        let store = StateStore::new(config.state_file.clone());
        let state = store.load(&config.symbol);

        info!(
            symbol = %config.symbol,
            status = state.status.name(),
            state_file = ?store.path(),
            "Bot for {} initialized",
            config.symbol
        );

        Self {
            exchange,
            signal: Box::new(signal),
            hooks: Box::new(hooks),
            store,
            state,
            quantity: config.quantity,
            interval: config.interval.clone(),
            window_size: config.window_size,
            bracket: BracketParams {
                stop_fraction: config.sl_fraction,
                target_fraction: config.tp_fraction,
                price_precision: config.price_precision,
            },
            cooldown: config.cooldown,
            polling_interval: config.polling_interval,
        }
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn status(&self) -> BotStatus {
        self.state.status
    }

    /// Poll forever. Stopping is up to the process.
    pub async fn run(&mut self) {
        loop {
            self.tick(Utc::now()).await;
            tokio::time::sleep(self.polling_interval).await;
        }
    }

    /// Advance the state machine by one step as of `now`, then persist
    pub async fn tick(&mut self, now: DateTime<Utc>) -> BotStatus {
        match self.state.status {
            BotStatus::WaitingForSignal => self.wait_for_signal().await,
            BotStatus::OrderPlaced => self.check_order_status(now).await,
            BotStatus::Timeout => self.check_timeout_passed(now),
        }

        if let Err(e) = self.store.save(&self.state) {
            error!("Failed to save state: {}", e);
        }
        self.state.status
    }

    async fn wait_for_signal(&mut self) {
        debug!("Checking for trading signal...");
        let symbol = self.state.symbol.clone();

        let window = match MarketWindow::fetch(
            self.exchange.as_ref(),
            &symbol,
            &self.interval,
            self.window_size,
        )
        .await
        {
            Ok(window) => window,
            Err(e) => {
                warn!(retryable = e.is_retryable(), "Market data unavailable: {}", e);
                return;
            }
        };
        if window.is_empty() {
            debug!("Empty market window, no signal");
            return;
        }

        let Some(side) = self.signal.check(&window.candles).side() else {
            debug!("No signal");
            return;
        };

        info!(
            last_close = ?window.last_close(),
            "{} signal detected. Placing order...",
            side.as_str()
        );
        match place_bracket(
            self.exchange.as_ref(),
            &symbol,
            side,
            self.quantity,
            &self.bracket,
        )
        .await
        {
            Ok(position) => {
                info!(
                    order_id = %position.order_id,
                    entry_price = position.entry_price,
                    "Position opened"
                );
                self.state.position = Some(position);
                self.state.status = BotStatus::OrderPlaced;
            }
            Err(e) => error!("Bracket placement failed, still waiting for signal: {}", e),
        }
    }

    async fn check_order_status(&mut self, now: DateTime<Utc>) {
        debug!("Checking order status...");
        let Some(mut position) = self.state.position.clone() else {
            error!("ORDER_PLACED without a position, resetting");
            self.reset();
            return;
        };
        if !position.has_bracket() {
            error!(order_id = %position.order_id, "Position has no bracket orders, resetting");
            self.reset();
            return;
        }
        if position.closed {
            warn!(order_id = %position.order_id, "Position already closed, entering cooldown");
            self.state.status = BotStatus::Timeout;
            if self.state.cooldown_start.is_none() {
                self.state.cooldown_start = Some(now);
            }
            return;
        }

        let polled = poll_bracket(self.exchange.as_ref(), &self.state.symbol, &position).await;
        let resolution = match polled {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(retryable = e.is_retryable(), "Order status unavailable: {}", e);
                return;
            }
        };
        if resolution == Resolution::Pending {
            debug!("Bracket still open");
            return;
        }

        position.closed = true;
        position.success = resolution == Resolution::FilledTp;
        info!(
            order_id = %position.order_id,
            success = position.success,
            "Position closed by {}",
            if position.success { "take-profit" } else { "stop-loss" }
        );

        if !notify(self.hooks.as_ref(), &position) {
            warn!(order_id = %position.order_id, "Position hook did not complete, continuing");
        }
        cancel_sibling(self.exchange.as_ref(), &self.state.symbol, &position, resolution).await;

        self.state.position = Some(position);
        self.state.status = BotStatus::Timeout;
        self.state.cooldown_start = Some(now);
        info!(cooldown_secs = self.cooldown.as_secs(), "Cooldown started");
    }

    fn check_timeout_passed(&mut self, now: DateTime<Utc>) {
        debug!("Checking if timeout has passed...");
        let passed = match self.state.cooldown_start {
            // negative elapsed (clock moved back) counts as not passed
            Some(start) => (now - start)
                .to_std()
                .map(|elapsed| elapsed > self.cooldown)
                .unwrap_or(false),
            None => {
                warn!("TIMEOUT without a cooldown anchor, treating as passed");
                true
            }
        };

        if passed {
            info!("Cooldown over. Waiting for signal...");
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.state.status = BotStatus::WaitingForSignal;
        self.state.position = None;
        self.state.cooldown_start = None;
    }
}
