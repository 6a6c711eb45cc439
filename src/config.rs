//! Bot configuration.
//!
//! Values come from the environment (a `.env` file is loaded by `main`),
//! or can be assembled in code with [`BotConfig::new`] and the `with_*`
//! setters when the bot is embedded.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_SYMBOL: &str = "BTCUSDT";
const DEFAULT_QUANTITY: f64 = 0.001;
const DEFAULT_POLLING_SECS: u64 = 60;
const DEFAULT_WINDOW_SIZE: usize = 50;
const DEFAULT_INTERVAL: &str = "15m";
const DEFAULT_SL_FRACTION: f64 = 0.0005; // 0.05% adverse move
const DEFAULT_TP_FRACTION: f64 = 0.0008; // 0.08% favourable move
const DEFAULT_PRICE_PRECISION: u32 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECV_WINDOW_MS: u64 = 5000;
const DEFAULT_MOMENTUM_THRESHOLD: f64 = 0.002;

/// Everything a bot instance needs to run.
///
/// `Debug` masks the API credentials.
#[derive(Clone)]
pub struct BotConfig {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    pub symbol: String,
    pub quantity: f64,
    pub polling_interval: Duration,
    pub state_file: Option<PathBuf>,
    pub window_size: usize,
    pub interval: String,
    pub sl_fraction: f64,
    pub tp_fraction: f64,
    pub cooldown: Duration,
    pub price_precision: u32,
    pub http_timeout: Duration,
    pub recv_window_ms: u64,
    pub momentum_threshold: f64,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars: Vec<char> = self.api_key.chars().collect();
        let masked_key = if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("BotConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("symbol", &self.symbol)
            .field("quantity", &self.quantity)
            .field("polling_interval", &self.polling_interval)
            .field("state_file", &self.state_file)
            .field("window_size", &self.window_size)
            .field("interval", &self.interval)
            .field("sl_fraction", &self.sl_fraction)
            .field("tp_fraction", &self.tp_fraction)
            .field("cooldown", &self.cooldown)
            .field("price_precision", &self.price_precision)
            .field("http_timeout", &self.http_timeout)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("momentum_threshold", &self.momentum_threshold)
            .finish()
    }
}

impl BotConfig {
    /// Config with defaults for everything but credentials and symbol
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            testnet: true,
            symbol: symbol.into(),
            quantity: DEFAULT_QUANTITY,
            polling_interval: Duration::from_secs(DEFAULT_POLLING_SECS),
            state_file: None,
            window_size: DEFAULT_WINDOW_SIZE,
            interval: DEFAULT_INTERVAL.to_string(),
            sl_fraction: DEFAULT_SL_FRACTION,
            tp_fraction: DEFAULT_TP_FRACTION,
            cooldown: Duration::ZERO,
            price_precision: DEFAULT_PRICE_PRECISION,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            momentum_threshold: DEFAULT_MOMENTUM_THRESHOLD,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn with_fractions(mut self, sl_fraction: f64, tp_fraction: f64) -> Self {
        self.sl_fraction = sl_fraction;
        self.tp_fraction = tp_fraction;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("BINANCE_API_KEY").ok_or(ConfigError::Missing("BINANCE_API_KEY"))?;
        let api_secret =
            lookup("BINANCE_API_SECRET").ok_or(ConfigError::Missing("BINANCE_API_SECRET"))?;
        let symbol = lookup("BOT_SYMBOL").unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

        let mut config = Self::new(api_key, api_secret, symbol.to_uppercase());

        config.testnet = match lookup("BINANCE_TESTNET") {
            Some(v) => parse_bool("BINANCE_TESTNET", &v)?,
            None => true,
        };
        config.quantity = parse_or(&lookup, "BOT_QUANTITY", DEFAULT_QUANTITY)?;
        config.polling_interval = Duration::from_secs(parse_or(
            &lookup,
            "BOT_POLLING_SECONDS",
            DEFAULT_POLLING_SECS,
        )?);
        config.state_file = lookup("BOT_STATE_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.window_size = parse_or(&lookup, "BOT_WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?;
        config.interval = lookup("BOT_INTERVAL").unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
        config.sl_fraction = parse_or(&lookup, "BOT_SL_FRACTION", DEFAULT_SL_FRACTION)?;
        config.tp_fraction = parse_or(&lookup, "BOT_TP_FRACTION", DEFAULT_TP_FRACTION)?;
        config.cooldown =
            Duration::from_secs(parse_or::<u64, _>(&lookup, "BOT_COOLDOWN_MINUTES", 0)? * 60);
        config.price_precision =
            parse_or(&lookup, "BOT_PRICE_PRECISION", DEFAULT_PRICE_PRECISION)?;
        config.http_timeout = Duration::from_secs(parse_or(
            &lookup,
            "BOT_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        config.recv_window_ms = parse_or(&lookup, "BOT_RECV_WINDOW_MS", DEFAULT_RECV_WINDOW_MS)?;
        config.momentum_threshold = parse_or(
            &lookup,
            "BOT_MOMENTUM_THRESHOLD",
            DEFAULT_MOMENTUM_THRESHOLD,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the bot cannot trade with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.quantity > 0.0) {
            return Err(invalid("BOT_QUANTITY", self.quantity));
        }
        if self.window_size == 0 {
            return Err(invalid("BOT_WINDOW_SIZE", self.window_size));
        }
        if !(self.sl_fraction > 0.0 && self.sl_fraction < 1.0) {
            return Err(invalid("BOT_SL_FRACTION", self.sl_fraction));
        }
        if !(self.tp_fraction > 0.0 && self.tp_fraction < 1.0) {
            return Err(invalid("BOT_TP_FRACTION", self.tp_fraction));
        }
        if self.symbol.is_empty() {
            return Err(invalid("BOT_SYMBOL", &self.symbol));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}
