//! Persistence ports.
//!
//! Every collection sits behind a trait so the services never see the backing
//! store. [`memory::InMemoryStore`] implements all of them.

pub mod memory;
pub mod seed;

use crate::aggregates::bid::{Bid, Offer, OfferStatus};
use crate::aggregates::listing::{Book, LendBook};
use crate::aggregates::order::Order;
use crate::aggregates::payment::LendPayment;
use crate::error::MarketResult;
use crate::lifecycle::job::{JobState, ScheduledJob};
use crate::notifications::model::{Notification, SnapshotStatus};
use crate::types::{AccountId, BidId, BookId, JobId, LendBookId, OfferId, OrderId, OrderStatus, Role};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use memory::InMemoryStore;
pub use seed::CatalogSeed;

/// Read access to listings.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Book for sale by id
    async fn book(&self, id: BookId) -> MarketResult<Option<Book>>;
    /// Book for rent by id
    async fn lend_book(&self, id: LendBookId) -> MarketResult<Option<LendBook>>;
    /// Add or replace a book for sale
    async fn add_book(&self, book: Book) -> MarketResult<()>;
    /// Add or replace a book for rent
    async fn add_lend_book(&self, book: LendBook) -> MarketResult<()>;
}

/// Order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a new order
    async fn insert(&self, order: Order) -> MarketResult<()>;

    /// Load an order
    async fn get(&self, id: OrderId) -> MarketResult<Option<Order>>;

    /// Replace an order if its stored status is still `expected`.
    ///
    /// # Errors
    ///
    /// [`crate::error::MarketError::InvalidTransition`] if another writer moved
    /// the order first.
    async fn update(&self, order: Order, expected: OrderStatus) -> MarketResult<()>;

    /// Orders placed by a buyer, newest first
    async fn by_buyer(&self, buyer: &AccountId) -> MarketResult<Vec<Order>>;

    /// Orders where the account is the seller or lender, newest first
    async fn by_counterparty(&self, account: &AccountId, role: Role) -> MarketResult<Vec<Order>>;
}

/// Notification storage.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Store a notification
    async fn insert(&self, notification: Notification) -> MarketResult<()>;

    /// Notifications for one recipient acting in one role, newest first
    async fn list_for(&self, recipient: &AccountId, role: Role) -> MarketResult<Vec<Notification>>;

    /// Patch the status snapshot of the request notification for `reference`.
    ///
    /// Returns the patched notification, or `None` if there is none.
    async fn settle_request(
        &self,
        reference: Uuid,
        status: SnapshotStatus,
    ) -> MarketResult<Option<Notification>>;
}

/// Bid and offer storage.
#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Store a new bid
    async fn insert_bid(&self, bid: Bid) -> MarketResult<()>;
    /// Load a bid
    async fn get_bid(&self, id: BidId) -> MarketResult<Option<Bid>>;
    /// Replace a bid
    async fn update_bid(&self, bid: Bid) -> MarketResult<()>;
    /// Open bids, newest first
    async fn open_bids(&self) -> MarketResult<Vec<Bid>>;

    /// Store a new offer
    async fn insert_offer(&self, offer: Offer) -> MarketResult<()>;
    /// Load an offer
    async fn get_offer(&self, id: OfferId) -> MarketResult<Option<Offer>>;
    /// Replace an offer if its stored status is still `expected`
    async fn update_offer(&self, offer: Offer, expected: OfferStatus) -> MarketResult<()>;
    /// Accepted offers of a buyer, most recently updated first
    async fn accepted_offers_for(&self, buyer: &AccountId) -> MarketResult<Vec<Offer>>;
}

/// Lender payment records.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Record a payment
    async fn record(&self, payment: LendPayment) -> MarketResult<()>;
    /// Payments received by a lender
    async fn for_lender(&self, lender: &AccountId) -> MarketResult<Vec<LendPayment>>;
}

/// Durable lifecycle job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a pending job
    async fn insert(&self, job: ScheduledJob) -> MarketResult<()>;
    /// Move a job to a final state
    async fn finish(&self, id: JobId, state: JobState) -> MarketResult<()>;
    /// Jobs still pending, earliest due first
    async fn pending(&self) -> MarketResult<Vec<ScheduledJob>>;
    /// Load a job
    async fn get(&self, id: JobId) -> MarketResult<Option<ScheduledJob>>;
}

/// All repositories the services need.
#[derive(Clone)]
pub struct Repositories {
    /// Listings
    pub catalog: Arc<dyn Catalog>,
    /// Orders
    pub orders: Arc<dyn OrderRepository>,
    /// Notifications
    pub notifications: Arc<dyn NotificationRepository>,
    /// Bids and offers
    pub bids: Arc<dyn BidRepository>,
    /// Lender payments
    pub payments: Arc<dyn PaymentLedger>,
    /// Lifecycle jobs
    pub jobs: Arc<dyn JobStore>,
}

impl Repositories {
    /// Back every repository with one shared in-memory store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(&Arc::new(InMemoryStore::new()))
    }

    /// Back every repository with `store`
    #[must_use]
    pub fn from_store(store: &Arc<InMemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            orders: store.clone(),
            notifications: store.clone(),
            bids: store.clone(),
            payments: store.clone(),
            jobs: store.clone(),
        }
    }
}
