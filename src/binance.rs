//! Binance USDⓈ-M futures REST client.
//!
//! Signs private requests with HMAC-SHA256 and maps Binance error codes onto
//! [`ExchangeError`]. Every request is bounded by the configured timeout so a
//! hung call surfaces as an error instead of stalling the bot.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error};

use crate::config::BotConfig;
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{CancelOutcome, Exchange, OrderAck, OrderKind, OrderRequest};
use crate::types::{Candle, OrderState};

type HmacSha256 = Hmac<Sha256>;

const LIVE_BASE_URL: &str = "https://fapi.binance.com";
const TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndexResponse {
    mark_price: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct KlineRow(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i32,
    msg: String,
}

/// Binance futures client wrapper
pub struct BinanceFuturesClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
}

impl BinanceFuturesClient {
    /// Build a client for the live or testnet endpoint chosen in `config`
    pub fn new(config: &BotConfig) -> ExchangeResult<Self> {
        let base_url = if config.testnet {
            TESTNET_BASE_URL
        } else {
            LIVE_BASE_URL
        };
        Self::with_base_url(config, base_url, config.http_timeout)
    }

    /// Build a client against an arbitrary base URL
    pub fn with_base_url(
        config: &BotConfig,
        base_url: &str,
        timeout: Duration,
    ) -> ExchangeResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window_ms: config.recv_window_ms,
        })
    }

    fn sign(&self, query: &str) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = Self::build_query(params);
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        };

        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Signed request; the query goes in the body for POST, in the URL otherwise
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let mut all_params = params.to_vec();
        all_params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        all_params.push(("recvWindow", self.recv_window_ms.to_string()));

        let query = Self::build_query(&all_params);
        let signed_query = format!("{}&signature={}", query, self.sign(&query)?);
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("{} (signed) {}", method, endpoint);

        let request = if method == Method::POST {
            self.http
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed_query)
        } else {
            self.http.request(method, format!("{}?{}", url, signed_query))
        };

        let response = request.header("X-MBX-APIKEY", &self.api_key).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::Parse(e.to_string())
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            return Err(ExchangeError::RateLimited);
        }

        match serde_json::from_str::<BinanceErrorBody>(&body) {
            Ok(err) => Err(map_error_code(err.code, &err.msg)),
            Err(_) => Err(ExchangeError::Api {
                code: status.as_u16() as i32,
                message: body,
            }),
        }
    }
}

fn map_error_code(code: i32, msg: &str) -> ExchangeError {
    match code {
        -1003 => ExchangeError::RateLimited,
        -1021 => ExchangeError::Timestamp(msg.to_string()),
        -1022 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
        -2011 | -2013 => ExchangeError::OrderNotFound(msg.to_string()),
        -2010 | -2019 | -2021 | -2022 => ExchangeError::OrderRejected(msg.to_string()),
        _ => ExchangeError::Api {
            code,
            message: msg.to_string(),
        },
    }
}

/// Plain decimal text for the wire, without float noise like `0.0010000000000000002`
fn format_decimal(value: f64) -> ExchangeResult<String> {
    Decimal::from_f64(value)
        .map(|d| d.normalize().to_string())
        .ok_or_else(|| ExchangeError::Parse(format!("not representable as decimal: {}", value)))
}

fn parse_f64(field: &str, raw: &str) -> ExchangeResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| ExchangeError::Parse(format!("bad {} value: {:?}", field, raw)))
}

/// Form parameters for an order request
fn order_params(request: &OrderRequest) -> ExchangeResult<Vec<(&'static str, String)>> {
    let mut params = vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
    ];

    match request.kind {
        OrderKind::Market { quantity } => {
            params.push(("type", "MARKET".to_string()));
            params.push(("quantity", format_decimal(quantity)?));
        }
        OrderKind::ReduceOnlyMarket { quantity } => {
            params.push(("type", "MARKET".to_string()));
            params.push(("quantity", format_decimal(quantity)?));
            params.push(("reduceOnly", "true".to_string()));
        }
        OrderKind::StopMarket { stop_price } | OrderKind::TakeProfitMarket { stop_price } => {
            let order_type = if matches!(request.kind, OrderKind::StopMarket { .. }) {
                "STOP_MARKET"
            } else {
                "TAKE_PROFIT_MARKET"
            };
            params.push(("type", order_type.to_string()));
            params.push(("stopPrice", format_decimal(stop_price)?));
            params.push(("closePosition", "true".to_string()));
            params.push(("timeInForce", "GTE_GTC".to_string()));
            params.push(("workingType", "MARK_PRICE".to_string()));
        }
    }

    Ok(params)
}

#[async_trait]
impl Exchange for BinanceFuturesClient {
    async fn create_order(&self, request: &OrderRequest) -> ExchangeResult<OrderAck> {
        let params = order_params(request)?;
        let resp: OrderResponse = self.signed(Method::POST, "/fapi/v1/order", &params).await?;
        Ok(OrderAck {
            order_id: resp.order_id.to_string(),
        })
    }

    async fn get_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderState> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let resp: OrderResponse = self.signed(Method::GET, "/fapi/v1/order", &params).await?;
        Ok(OrderState::parse(&resp.status))
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<CancelOutcome> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        match self
            .signed::<OrderResponse>(Method::DELETE, "/fapi/v1/order", &params)
            .await
        {
            Ok(_) => Ok(CancelOutcome::Cancelled),
            Err(ExchangeError::OrderNotFound(_)) => Ok(CancelOutcome::AlreadyResolved),
            Err(e) => Err(e),
        }
    }

    async fn mark_price(&self, symbol: &str) -> ExchangeResult<f64> {
        let resp: PremiumIndexResponse = self
            .public_get("/fapi/v1/premiumIndex", &[("symbol", symbol.to_string())])
            .await?;
        parse_f64("markPrice", &resp.mark_price)
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        let rows: Vec<KlineRow> = self
            .public_get(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Candle {
                    open_time: row.0,
                    open: parse_f64("open", &row.1)?,
                    high: parse_f64("high", &row.2)?,
                    low: parse_f64("low", &row.3)?,
                    close: parse_f64("close", &row.4)?,
                    volume: parse_f64("volume", &row.5)?,
                })
            })
            .collect()
    }
}
