use std::sync::Arc;

use anyhow::Context;
use bracket_bot::binance::BinanceFuturesClient;
use bracket_bot::hooks::LoggingHooks;
use bracket_bot::signal::MomentumSignal;
use bracket_bot::{BotConfig, TradingBot};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bracket_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env().context("invalid configuration")?;
    info!(
        "Starting bracket bot for {} ({})",
        config.symbol,
        if config.testnet { "🟢 TESTNET" } else { "🔴 LIVE" }
    );
    info!(
        quantity = config.quantity,
        sl_fraction = config.sl_fraction,
        tp_fraction = config.tp_fraction,
        cooldown_secs = config.cooldown.as_secs(),
        polling_secs = config.polling_interval.as_secs(),
        state_file = ?config.state_file,
        "Configuration loaded"
    );

    let exchange = Arc::new(
        BinanceFuturesClient::new(&config).context("failed to build exchange client")?,
    );
    let signal = MomentumSignal::new(config.momentum_threshold);
    let mut bot = TradingBot::new(&config, exchange, signal, LoggingHooks);

    // Runs until Ctrl-C
    tokio::select! {
        _ = bot.run() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("Shutdown requested, exiting");
        }
    }

    Ok(())
}
