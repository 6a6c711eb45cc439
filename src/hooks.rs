//! Position outcome callbacks.
//!
//! Hooks run synchronously inside the tick that resolves a position. A hook
//! that fails or panics is logged and swallowed, so the state machine still
//! completes its transition.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, info};

use crate::types::Position;

/// Receives each resolved position exactly once
pub trait PositionHooks: Send + Sync {
    /// Take-profit filled
    fn on_success(&self, position: &Position) -> anyhow::Result<()>;

    /// Stop-loss filled
    fn on_failure(&self, position: &Position) -> anyhow::Result<()>;
}

/// Hooks that only log the outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl PositionHooks for LoggingHooks {
    fn on_success(&self, position: &Position) -> anyhow::Result<()> {
        info!(order_id = %position.order_id, "✅ Position closed at take-profit");
        Ok(())
    }

    fn on_failure(&self, position: &Position) -> anyhow::Result<()> {
        info!(order_id = %position.order_id, "❌ Position closed at stop-loss");
        Ok(())
    }
}

/// Hooks built from a pair of closures
pub struct FnHooks<S, F> {
    success: S,
    failure: F,
}

impl<S, F> FnHooks<S, F>
where
    S: Fn(&Position) -> anyhow::Result<()> + Send + Sync,
    F: Fn(&Position) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(success: S, failure: F) -> Self {
        Self { success, failure }
    }
}

impl<S, F> PositionHooks for FnHooks<S, F>
where
    S: Fn(&Position) -> anyhow::Result<()> + Send + Sync,
    F: Fn(&Position) -> anyhow::Result<()> + Send + Sync,
{
    fn on_success(&self, position: &Position) -> anyhow::Result<()> {
        (self.success)(position)
    }

    fn on_failure(&self, position: &Position) -> anyhow::Result<()> {
        (self.failure)(position)
    }
}

/// Run the hook matching `position.success`, containing errors and panics.
/// Returns whether the hook completed cleanly.
pub fn notify(hooks: &dyn PositionHooks, position: &Position) -> bool {
    let name = if position.success { "on_success" } else { "on_failure" };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if position.success {
            hooks.on_success(position)
        } else {
            hooks.on_failure(position)
        }
    }));

    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(hook = name, order_id = %position.order_id, "Position hook failed: {:#}", e);
            false
        }
        Err(_) => {
            error!(hook = name, order_id = %position.order_id, "Position hook panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn closed_position(success: bool) -> Position {
        Position {
            entry_price: 100.0,
            side: Side::Buy,
            order_id: "1".into(),
            quantity: 0.001,
            sl_price: Some(99.95),
            sl_order_id: Some("2".into()),
            tp_price: Some(100.08),
            tp_order_id: Some("3".into()),
            closed: true,
            success,
        }
    }

    #[test]
    fn test_notify_dispatches_on_outcome() {
        let wins = Arc::new(AtomicUsize::new(0));
        let losses = Arc::new(AtomicUsize::new(0));
        let (w, l) = (Arc::clone(&wins), Arc::clone(&losses));
        let hooks = FnHooks::new(
            move |_: &Position| {
                w.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            move |_: &Position| {
                l.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

        assert!(notify(&hooks, &closed_position(true)));
        assert!(notify(&hooks, &closed_position(false)));
        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(losses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_contains_errors_and_panics() {
        let hooks = FnHooks::new(
            |_: &Position| anyhow::bail!("webhook down"),
            |_: &Position| panic!("hook bug"),
        );

        assert!(!notify(&hooks, &closed_position(true)));
        assert!(!notify(&hooks, &closed_position(false)));
    }

    #[test]
    fn test_logging_hooks() {
        assert!(notify(&LoggingHooks, &closed_position(true)));
    }
}
