//! Purchase and rental order operations.

use super::engine::OrderEngine;
use crate::aggregates::order::{Order, OrderAction};
use crate::error::{MarketError, MarketResult};
use crate::notifications::{templates, Notifier};
use crate::store::{Catalog, OrderRepository};
use crate::types::{AccountId, BookId, Decision, LendBookId, OrderId, Role};
use librix_core::environment::Clock;
use std::sync::Arc;
use tracing::info;

/// Entry point for buyers placing orders and counterparties answering them.
#[derive(Clone)]
pub struct OrderDesk {
    catalog: Arc<dyn Catalog>,
    orders: Arc<dyn OrderRepository>,
    notifier: Notifier,
    engine: Arc<OrderEngine>,
    clock: Arc<dyn Clock>,
}

impl OrderDesk {
    /// Creates a new `OrderDesk`
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        orders: Arc<dyn OrderRepository>,
        notifier: Notifier,
        engine: Arc<OrderEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            orders,
            notifier,
            engine,
            clock,
        }
    }

    /// Place a pending purchase and ask the seller.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if the book is not listed, or a store error.
    pub async fn place_purchase(&self, buyer: AccountId, book_id: BookId) -> MarketResult<Order> {
        let book = self
            .catalog
            .book(book_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Book", book_id))?;

        let order = Order::purchase(&book, buyer, self.clock.now());
        self.orders.insert(order.clone()).await?;
        metrics::counter!("orders.placed", "kind" => order.kind.as_str()).increment(1);
        info!(order_id = %order.id, seller = %order.counterparty, "Purchase order placed");

        self.notifier.notify(templates::order_requested(&order)).await?;
        Ok(order)
    }

    /// Place a rental, notify the lender and the buyer, and start delivery.
    ///
    /// Rentals need no lender answer: the order is stored `accepted` and its
    /// lifecycle is armed before returning.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the book is not listed for rent
    /// - [`MarketError::Validation`] if `weeks` is zero
    pub async fn place_rental(
        &self,
        buyer: AccountId,
        book_id: LendBookId,
        weeks: u32,
    ) -> MarketResult<Order> {
        let book = self
            .catalog
            .lend_book(book_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Book", book_id))?;

        let order = Order::rental(&book, buyer, weeks, self.clock.now())?;
        self.orders.insert(order.clone()).await?;
        metrics::counter!("orders.placed", "kind" => order.kind.as_str()).increment(1);
        info!(order_id = %order.id, lender = %order.counterparty, weeks, "Rental order placed");

        self.notifier.notify(templates::order_requested(&order)).await?;
        self.notifier.notify(templates::rental_placed(&order)).await?;

        self.engine.dispatch(OrderAction::Arm { order_id: order.id }).await
    }

    /// Accept or decline a pending purchase as its seller.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the order does not exist
    /// - [`MarketError::Forbidden`] if `responder` is not the counterparty
    /// - [`MarketError::InvalidTransition`] if the order is no longer pending
    pub async fn respond(
        &self,
        order_id: OrderId,
        decision: Decision,
        responder: AccountId,
        responder_role: Role,
    ) -> MarketResult<Order> {
        self.engine
            .dispatch(OrderAction::Respond {
                order_id,
                decision,
                responder,
                responder_role,
            })
            .await
    }

    /// Mark a delivered rental as returned.
    ///
    /// # Errors
    ///
    /// [`MarketError::Forbidden`] for anyone but the lender,
    /// [`MarketError::InvalidTransition`] unless the rental is delivered.
    pub async fn mark_returned(&self, order_id: OrderId, lender: AccountId) -> MarketResult<Order> {
        self.engine
            .dispatch(OrderAction::MarkReturned {
                order_id,
                responder: lender,
            })
            .await
    }

    /// Orders placed by `buyer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn buyer_orders(&self, buyer: &AccountId) -> MarketResult<Vec<Order>> {
        self.orders.by_buyer(buyer).await
    }

    /// Orders where `account` is the seller or lender, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn counterparty_orders(&self, account: &AccountId, role: Role) -> MarketResult<Vec<Order>> {
        self.orders.by_counterparty(account, role).await
    }
}
