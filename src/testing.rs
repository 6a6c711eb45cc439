//! Scripted in-memory exchange for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{CancelOutcome, Exchange, OrderAck, OrderKind, OrderRequest};
use crate::types::{Candle, OrderState};

type CreateFilter = Box<dyn Fn(&OrderRequest) -> bool + Send + Sync>;

pub struct MockExchange {
    mark: Mutex<f64>,
    klines: Mutex<Vec<Candle>>,
    orders: Mutex<HashMap<String, OrderState>>,
    created: Mutex<Vec<(String, OrderRequest)>>,
    cancelled: Mutex<Vec<String>>,
    polled: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_create: Mutex<Option<CreateFilter>>,
    fail_get_order: AtomicBool,
    fail_mark_price: AtomicBool,
    fail_cancel: AtomicBool,
    fail_klines: AtomicBool,
}

impl MockExchange {
    pub fn new(mark: f64) -> Self {
        Self {
            mark: Mutex::new(mark),
            klines: Mutex::new(Vec::new()),
            orders: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_create: Mutex::new(None),
            fail_get_order: AtomicBool::new(false),
            fail_mark_price: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
            fail_klines: AtomicBool::new(false),
        }
    }

    pub fn set_klines(&self, candles: Vec<Candle>) {
        *self.klines.lock().unwrap() = candles;
    }

    pub fn set_order_state(&self, order_id: &str, state: OrderState) {
        self.orders
            .lock()
            .unwrap()
            .insert(order_id.to_string(), state);
    }

    pub fn order_state(&self, order_id: &str) -> Option<OrderState> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    /// Reject every create request matching `filter`
    pub fn fail_create_when<F>(&self, filter: F)
    where
        F: Fn(&OrderRequest) -> bool + Send + Sync + 'static,
    {
        *self.fail_create.lock().unwrap() = Some(Box::new(filter));
    }

    pub fn set_fail_get_order(&self, fail: bool) {
        self.fail_get_order.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mark_price(&self, fail: bool) {
        self.fail_mark_price.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_klines(&self, fail: bool) {
        self.fail_klines.store(fail, Ordering::SeqCst);
    }

    /// Every accepted order, in submission order
    pub fn created(&self) -> Vec<(String, OrderRequest)> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_kinds(&self) -> Vec<OrderKind> {
        self.created().into_iter().map(|(_, r)| r.kind).collect()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn polled(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn create_order(&self, request: &OrderRequest) -> ExchangeResult<OrderAck> {
        if let Some(filter) = self.fail_create.lock().unwrap().as_ref() {
            if filter(request) {
                return Err(ExchangeError::OrderRejected("scripted rejection".into()));
            }
        }

        let order_id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let state = match request.kind {
            OrderKind::Market { .. } | OrderKind::ReduceOnlyMarket { .. } => OrderState::Filled,
            _ => OrderState::New,
        };
        self.set_order_state(&order_id, state);
        self.created
            .lock()
            .unwrap()
            .push((order_id.clone(), request.clone()));
        Ok(OrderAck { order_id })
    }

    async fn get_order(&self, _symbol: &str, order_id: &str) -> ExchangeResult<OrderState> {
        self.polled.lock().unwrap().push(order_id.to_string());
        if self.fail_get_order.load(Ordering::SeqCst) {
            return Err(ExchangeError::Network("connection reset".into()));
        }
        self.order_state(order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &str) -> ExchangeResult<CancelOutcome> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(ExchangeError::Timeout("cancel".into()));
        }
        let mut orders = self.orders.lock().unwrap();
        match orders.get(order_id) {
            Some(OrderState::New) | Some(OrderState::PartiallyFilled) => {
                orders.insert(order_id.to_string(), OrderState::Canceled);
                self.cancelled.lock().unwrap().push(order_id.to_string());
                Ok(CancelOutcome::Cancelled)
            }
            _ => Ok(CancelOutcome::AlreadyResolved),
        }
    }

    async fn mark_price(&self, _symbol: &str) -> ExchangeResult<f64> {
        if self.fail_mark_price.load(Ordering::SeqCst) {
            return Err(ExchangeError::Timeout("premiumIndex".into()));
        }
        Ok(*self.mark.lock().unwrap())
    }

    async fn klines(
        &self,
        _symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        if self.fail_klines.load(Ordering::SeqCst) {
            return Err(ExchangeError::RateLimited);
        }
        Ok(self.klines.lock().unwrap().clone())
    }
}

/// Flat candle closing at `close`
pub fn candle(open_time: i64, close: f64) -> Candle {
    Candle {
        open_time,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}
