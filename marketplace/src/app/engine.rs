//! Shell around the order reducer.
//!
//! 1. Load the order
//! 2. Run the reducer
//! 3. Persist the new status (compare-and-set on the old one)
//! 4. Perform the outbox in order
//! 5. Hand timer and job effects to the runner

use crate::aggregates::order::{Order, OrderAction, OrderEnvironment, OrderReducer, OrderState, Outgoing};
use crate::error::{MarketError, MarketResult};
use crate::notifications::Notifier;
use crate::store::{OrderRepository, PaymentLedger};
use librix_core::reducer::Reducer;
use librix_runtime::EffectRunner;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies [`OrderAction`]s to stored orders.
pub struct OrderEngine {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentLedger>,
    notifier: Notifier,
    reducer: OrderReducer,
    env: OrderEnvironment,
    runner: EffectRunner<OrderAction>,
}

impl OrderEngine {
    /// Creates a new `OrderEngine`
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentLedger>,
        notifier: Notifier,
        env: OrderEnvironment,
        runner: EffectRunner<OrderAction>,
    ) -> Self {
        Self {
            orders,
            payments,
            notifier,
            reducer: OrderReducer::new(),
            env,
            runner,
        }
    }

    /// Apply `action` to its order and return the order as stored afterwards.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the order does not exist
    /// - whatever the reducer rejected the action with
    /// - [`MarketError::InvalidTransition`] if another writer moved the order
    ///   between load and save
    pub async fn dispatch(&self, action: OrderAction) -> MarketResult<Order> {
        let order_id = action.order_id();
        let label = action.label();

        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Order", order_id))?;
        let before = order.status;

        let mut state = OrderState::new(order);
        let effects = self.reducer.reduce(&mut state, action, &self.env);

        if let Some(error) = state.last_error.take() {
            metrics::counter!("orders.rejected", "action" => label, "reason" => error.kind()).increment(1);
            debug!(%order_id, action = label, %error, "Order action rejected");
            return Err(error);
        }

        let after = state.order.status;
        if after != before {
            self.orders.update(state.order.clone(), before).await?;
            metrics::counter!("orders.transitions", "from" => before.as_str(), "to" => after.as_str())
                .increment(1);
            info!(%order_id, action = label, from = %before, to = %after, "Order transitioned");
        }

        for outgoing in state.outbox.drain(..) {
            self.perform(outgoing).await;
        }

        if let Err(error) = self.runner.execute_all(effects).await {
            warn!(%order_id, action = label, %error, "Effects not fully executed; pending jobs stay for recovery");
        }

        Ok(state.order)
    }

    async fn perform(&self, outgoing: Outgoing) {
        let result = match outgoing {
            Outgoing::Notify(draft) => self.notifier.notify(draft).await.map(|_| ()),
            Outgoing::SettleRequest { reference, status } => {
                self.notifier.settle_request(reference, status).await
            },
            Outgoing::Nudge(room) => {
                self.notifier.nudge(&room).await;
                Ok(())
            },
            Outgoing::RecordPayment(payment) => {
                let order_id = payment.order;
                let result = self.payments.record(payment).await;
                if result.is_ok() {
                    debug!(%order_id, "Lender payment recorded");
                }
                result
            },
        };

        if let Err(error) = result {
            error!(%error, "Order side effect failed");
        }
    }
}
