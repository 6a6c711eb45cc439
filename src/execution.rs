//! Bracket-order protocol.
//!
//! A bracket is a market entry plus two closing-side orders (stop-loss and
//! take-profit) that each close the whole position when triggered. Placement
//! either completes all three orders or undoes the entry.

use tracing::{error, info, warn};

use crate::error::{BracketError, ExchangeError, ExchangeResult, RollbackError};
use crate::exchange::{CancelOutcome, Exchange, OrderKind, OrderRequest};
use crate::risk::{BracketLevels, BracketParams};
use crate::types::{Position, Side};

/// Which protective order filled, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    FilledTp,
    FilledSl,
}

/// Open a position on `side` and protect it with a stop-loss and a take-profit.
///
/// If anything after the entry fails, the protective order already placed is
/// cancelled and the entry is flattened with a reduce-only market order.
pub async fn place_bracket(
    exchange: &dyn Exchange,
    symbol: &str,
    side: Side,
    quantity: f64,
    params: &BracketParams,
) -> Result<Position, BracketError> {
    let entry = exchange
        .create_order(&OrderRequest::new(symbol, side, OrderKind::Market { quantity }))
        .await
        .map_err(BracketError::Entry)?;
    info!(order_id = %entry.order_id, side = side.as_str(), quantity, "Entry order placed");

    let mut placed_sl: Option<String> = None;
    let protected = protect(
        exchange,
        symbol,
        side,
        &entry.order_id,
        quantity,
        params,
        &mut placed_sl,
    )
    .await;
    match protected {
        Ok(position) => Ok(position),
        Err(cause) => {
            warn!(
                entry_order_id = %entry.order_id,
                "Bracket incomplete ({}), rolling back entry", cause
            );
            match rollback(exchange, symbol, side, quantity, placed_sl.as_deref()).await {
                Ok(()) => Err(BracketError::RolledBack {
                    entry_order_id: entry.order_id,
                    cause,
                }),
                Err(rollback) => {
                    error!(
                        entry_order_id = %entry.order_id,
                        "Rollback failed, position may be open without protection: {}", rollback
                    );
                    Err(BracketError::RollbackFailed {
                        entry_order_id: entry.order_id,
                        cause,
                        rollback,
                    })
                }
            }
        }
    }
}

/// Steps after the entry: read mark, compute levels, place both protective orders
async fn protect(
    exchange: &dyn Exchange,
    symbol: &str,
    side: Side,
    entry_order_id: &str,
    quantity: f64,
    params: &BracketParams,
    placed_sl: &mut Option<String>,
) -> ExchangeResult<Position> {
    let mark = exchange.mark_price(symbol).await?;
    let levels = BracketLevels::compute(side, mark, params);
    let close_side = side.opposite();

    let sl = exchange
        .create_order(&OrderRequest::new(
            symbol,
            close_side,
            OrderKind::StopMarket {
                stop_price: levels.stop_price,
            },
        ))
        .await?;
    *placed_sl = Some(sl.order_id.clone());

    let tp = exchange
        .create_order(&OrderRequest::new(
            symbol,
            close_side,
            OrderKind::TakeProfitMarket {
                stop_price: levels.target_price,
            },
        ))
        .await?;

    info!(
        entry = mark,
        sl_price = levels.stop_price,
        sl_order_id = %sl.order_id,
        tp_price = levels.target_price,
        tp_order_id = %tp.order_id,
        "Bracket placed"
    );

    Ok(Position {
        entry_price: mark,
        side,
        order_id: entry_order_id.to_string(),
        quantity,
        sl_price: Some(levels.stop_price),
        sl_order_id: Some(sl.order_id),
        tp_price: Some(levels.target_price),
        tp_order_id: Some(tp.order_id),
        closed: false,
        success: false,
    })
}

/// Undo a filled entry. The flatten is sent even when the stop-loss cancel fails.
async fn rollback(
    exchange: &dyn Exchange,
    symbol: &str,
    side: Side,
    quantity: f64,
    placed_sl: Option<&str>,
) -> Result<(), RollbackError> {
    let mut failed = RollbackError::default();

    if let Some(sl_order_id) = placed_sl {
        // A dangling close-position trigger would fire against the next trade
        if let Err(e) = exchange.cancel_order(symbol, sl_order_id).await {
            error!(order_id = sl_order_id, "Failed to cancel stop-loss during rollback: {}", e);
            failed.cancel = Some(e);
        }
    }

    let flatten = OrderRequest::new(
        symbol,
        side.opposite(),
        OrderKind::ReduceOnlyMarket { quantity },
    );
    match exchange.create_order(&flatten).await {
        Ok(ack) => info!(order_id = %ack.order_id, "Entry flattened"),
        Err(e) => failed.flatten = Some(e),
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(failed)
    }
}

/// Check both protective orders. Take-profit wins if both report filled.
pub async fn poll_bracket(
    exchange: &dyn Exchange,
    symbol: &str,
    position: &Position,
) -> ExchangeResult<Resolution> {
    let (Some(sl_order_id), Some(tp_order_id)) =
        (position.sl_order_id.as_deref(), position.tp_order_id.as_deref())
    else {
        return Err(ExchangeError::OrderNotFound(format!(
            "position {} has no bracket",
            position.order_id
        )));
    };

    let tp_state = exchange.get_order(symbol, tp_order_id).await?;
    let sl_state = exchange.get_order(symbol, sl_order_id).await?;

    Ok(if tp_state.is_filled() {
        Resolution::FilledTp
    } else if sl_state.is_filled() {
        Resolution::FilledSl
    } else {
        Resolution::Pending
    })
}

/// Cancel the order that did not fill. Failures are logged, never returned.
pub async fn cancel_sibling(
    exchange: &dyn Exchange,
    symbol: &str,
    position: &Position,
    resolution: Resolution,
) {
    let sibling = match resolution {
        Resolution::FilledTp => position.sl_order_id.as_deref(),
        Resolution::FilledSl => position.tp_order_id.as_deref(),
        Resolution::Pending => None,
    };
    let Some(order_id) = sibling else {
        return;
    };

    match exchange.cancel_order(symbol, order_id).await {
        Ok(CancelOutcome::Cancelled) => info!(order_id, "Sibling order cancelled"),
        Ok(CancelOutcome::AlreadyResolved) => {
            info!(order_id, "Sibling order already resolved")
        }
        Err(e) => warn!(order_id, "Failed to cancel sibling order: {}", e),
    }
}
