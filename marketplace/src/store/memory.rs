//! In-memory backing store.
//!
//! Each collection is a map behind its own `tokio::sync::RwLock`, so writes to
//! one collection are serialised without blocking the others.

use super::{BidRepository, Catalog, JobStore, NotificationRepository, OrderRepository, PaymentLedger};
use crate::aggregates::bid::{Bid, BidStatus, Offer, OfferStatus};
use crate::aggregates::listing::{Book, LendBook};
use crate::aggregates::order::Order;
use crate::aggregates::payment::LendPayment;
use crate::error::{MarketError, MarketResult};
use crate::lifecycle::job::{JobState, ScheduledJob};
use crate::notifications::model::{Notification, SnapshotStatus};
use crate::types::{
    AccountId, BidId, BookId, JobId, LendBookId, OfferId, OrderId, OrderStatus, Role,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Every marketplace collection, kept in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    books: RwLock<HashMap<BookId, Book>>,
    lend_books: RwLock<HashMap<LendBookId, LendBook>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    // Append-only, so equal timestamps list in reverse insertion order.
    notifications: RwLock<Vec<Notification>>,
    bids: RwLock<HashMap<BidId, Bid>>,
    offers: RwLock<HashMap<OfferId, Offer>>,
    payments: RwLock<Vec<LendPayment>>,
    jobs: RwLock<HashMap<JobId, ScheduledJob>>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// Stable, so ties keep the incoming order.
fn newest_first<T>(mut items: Vec<T>, key: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn book(&self, id: BookId) -> MarketResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn lend_book(&self, id: LendBookId) -> MarketResult<Option<LendBook>> {
        Ok(self.lend_books.read().await.get(&id).cloned())
    }

    async fn add_book(&self, book: Book) -> MarketResult<()> {
        self.books.write().await.insert(book.id, book);
        Ok(())
    }

    async fn add_lend_book(&self, book: LendBook) -> MarketResult<()> {
        self.lend_books.write().await.insert(book.id, book);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: Order) -> MarketResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(MarketError::Storage(format!("Order {} already exists", order.id)));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> MarketResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(&self, order: Order, expected: OrderStatus) -> MarketResult<()> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or_else(|| MarketError::not_found("Order", order.id))?;
        if stored.status != expected {
            return Err(MarketError::InvalidTransition(format!(
                "Order {} is already {}",
                order.id, stored.status
            )));
        }
        *stored = order;
        Ok(())
    }

    async fn by_buyer(&self, buyer: &AccountId) -> MarketResult<Vec<Order>> {
        let orders = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| &o.buyer == buyer)
            .cloned()
            .collect();
        Ok(newest_first(orders, |o| o.created_at))
    }

    async fn by_counterparty(&self, account: &AccountId, role: Role) -> MarketResult<Vec<Order>> {
        let orders = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| &o.counterparty == account && o.counterparty_role == role)
            .cloned()
            .collect();
        Ok(newest_first(orders, |o| o.created_at))
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn insert(&self, notification: Notification) -> MarketResult<()> {
        self.notifications.write().await.push(notification);
        Ok(())
    }

    async fn list_for(&self, recipient: &AccountId, role: Role) -> MarketResult<Vec<Notification>> {
        let notifications = self
            .notifications
            .read()
            .await
            .iter()
            .rev()
            .filter(|n| &n.recipient == recipient && n.recipient_role == role)
            .cloned()
            .collect();
        Ok(newest_first(notifications, |n| n.created_at))
    }

    async fn settle_request(
        &self,
        reference: Uuid,
        status: SnapshotStatus,
    ) -> MarketResult<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        let request = notifications
            .iter_mut()
            .find(|n| n.is_request_for(reference));
        Ok(request.map(|n| {
            n.order_status = Some(status);
            n.clone()
        }))
    }
}

#[async_trait]
impl BidRepository for InMemoryStore {
    async fn insert_bid(&self, bid: Bid) -> MarketResult<()> {
        self.bids.write().await.insert(bid.id, bid);
        Ok(())
    }

    async fn get_bid(&self, id: BidId) -> MarketResult<Option<Bid>> {
        Ok(self.bids.read().await.get(&id).cloned())
    }

    async fn update_bid(&self, bid: Bid) -> MarketResult<()> {
        let mut bids = self.bids.write().await;
        let stored = bids
            .get_mut(&bid.id)
            .ok_or_else(|| MarketError::not_found("Bid", bid.id))?;
        *stored = bid;
        Ok(())
    }

    async fn open_bids(&self) -> MarketResult<Vec<Bid>> {
        let bids = self
            .bids
            .read()
            .await
            .values()
            .filter(|b| b.status == BidStatus::Open)
            .cloned()
            .collect();
        Ok(newest_first(bids, |b| b.created_at))
    }

    async fn insert_offer(&self, offer: Offer) -> MarketResult<()> {
        self.offers.write().await.insert(offer.id, offer);
        Ok(())
    }

    async fn get_offer(&self, id: OfferId) -> MarketResult<Option<Offer>> {
        Ok(self.offers.read().await.get(&id).cloned())
    }

    async fn update_offer(&self, offer: Offer, expected: OfferStatus) -> MarketResult<()> {
        let mut offers = self.offers.write().await;
        let stored = offers
            .get_mut(&offer.id)
            .ok_or_else(|| MarketError::not_found("Offer", offer.id))?;
        if stored.status != expected {
            return Err(MarketError::InvalidTransition(format!(
                "Offer {} is already {}",
                offer.id, stored.status
            )));
        }
        *stored = offer;
        Ok(())
    }

    async fn accepted_offers_for(&self, buyer: &AccountId) -> MarketResult<Vec<Offer>> {
        let offers = self
            .offers
            .read()
            .await
            .values()
            .filter(|o| &o.buyer == buyer && o.status == OfferStatus::Accepted)
            .cloned()
            .collect();
        Ok(newest_first(offers, |o| o.updated_at))
    }
}

#[async_trait]
impl PaymentLedger for InMemoryStore {
    async fn record(&self, payment: LendPayment) -> MarketResult<()> {
        self.payments.write().await.push(payment);
        Ok(())
    }

    async fn for_lender(&self, lender: &AccountId) -> MarketResult<Vec<LendPayment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| &p.lender == lender)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert(&self, job: ScheduledJob) -> MarketResult<()> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn finish(&self, id: JobId, state: JobState) -> MarketResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| MarketError::not_found("Job", id))?;
        job.state = state;
        Ok(())
    }

    async fn pending(&self) -> MarketResult<Vec<ScheduledJob>> {
        let mut jobs: Vec<ScheduledJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.state == JobState::Pending)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.due_at);
        Ok(jobs)
    }

    async fn get(&self, id: JobId) -> MarketResult<Option<ScheduledJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }
}
