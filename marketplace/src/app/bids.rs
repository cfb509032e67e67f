//! Reverse bidding operations.

use super::engine::OrderEngine;
use super::images::{ImageStore, ImageUpload};
use crate::aggregates::bid::{Bid, Offer, OfferStatus, OfferTerms};
use crate::aggregates::order::{Order, OrderAction};
use crate::error::{MarketError, MarketResult};
use crate::notifications::{templates, Notifier, SnapshotStatus};
use crate::store::{BidRepository, OrderRepository};
use crate::types::{AccountId, BidId, Decision, OfferId};
use librix_core::environment::Clock;
use std::sync::Arc;
use tracing::info;

/// Outcome of a buyer answering an offer.
#[derive(Clone, Debug)]
pub struct OfferResponse {
    /// The offer after the answer
    pub offer: Offer,
    /// Order created when the offer was accepted
    pub order: Option<Order>,
}

/// Entry point for bids and offers.
#[derive(Clone)]
pub struct BidDesk {
    bids: Arc<dyn BidRepository>,
    orders: Arc<dyn OrderRepository>,
    images: Arc<dyn ImageStore>,
    notifier: Notifier,
    engine: Arc<OrderEngine>,
    clock: Arc<dyn Clock>,
}

impl BidDesk {
    /// Creates a new `BidDesk`
    #[must_use]
    pub fn new(
        bids: Arc<dyn BidRepository>,
        orders: Arc<dyn OrderRepository>,
        images: Arc<dyn ImageStore>,
        notifier: Notifier,
        engine: Arc<OrderEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bids,
            orders,
            images,
            notifier,
            engine,
            clock,
        }
    }

    /// Post a bid request.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] if the book name or comment is blank.
    pub async fn post_bid(&self, buyer: AccountId, book_name: &str, comment: &str) -> MarketResult<Bid> {
        let bid = Bid::post(buyer, book_name, comment, self.clock.now())?;
        self.bids.insert_bid(bid.clone()).await?;
        info!(bid_id = %bid.id, buyer = %bid.buyer, "Bid posted");
        Ok(bid)
    }

    /// Open bids, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn open_bids(&self) -> MarketResult<Vec<Bid>> {
        self.bids.open_bids().await
    }

    /// Make an offer on an open bid and notify its buyer.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the bid does not exist
    /// - [`MarketError::InvalidTransition`] if the bid is fulfilled
    /// - [`MarketError::Validation`] if the image is missing or not an image
    pub async fn create_offer(
        &self,
        seller: AccountId,
        bid_id: BidId,
        terms: OfferTerms,
        image: Option<ImageUpload>,
    ) -> MarketResult<Offer> {
        let bid = self
            .bids
            .get_bid(bid_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Bid", bid_id))?;
        let image = image.ok_or_else(|| MarketError::Validation("Book image is required".to_string()))?;

        // Validate before the upload is stored.
        let mut offer = Offer::make(&bid, seller, terms, String::new(), self.clock.now())?;
        offer.image_url = self.images.store(image).await?;

        self.bids.insert_offer(offer.clone()).await?;
        info!(offer_id = %offer.id, %bid_id, seller = %offer.seller, "Offer created");

        self.notifier.notify(templates::offer_received(&offer, &bid)).await?;
        Ok(offer)
    }

    /// Accept or decline an offer as the bid's buyer.
    ///
    /// Accepting fulfils the bid, creates an accepted order and arms its
    /// delivery sequence. Other offers on the bid are left as they are.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the offer or its bid does not exist
    /// - [`MarketError::Forbidden`] if `buyer` did not post the bid
    /// - [`MarketError::InvalidTransition`] if the offer was already answered
    pub async fn respond_offer(
        &self,
        buyer: AccountId,
        offer_id: OfferId,
        decision: Decision,
    ) -> MarketResult<OfferResponse> {
        let mut offer = self
            .bids
            .get_offer(offer_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Offer", offer_id))?;
        let mut bid = self
            .bids
            .get_bid(offer.bid)
            .await?
            .ok_or_else(|| MarketError::not_found("Bid", offer.bid))?;

        let now = self.clock.now();
        offer.answer(decision, &buyer, now)?;
        self.bids.update_offer(offer.clone(), OfferStatus::Pending).await?;
        info!(%offer_id, status = %offer.status, "Offer answered");

        self.notifier
            .settle_request(*offer.id.as_uuid(), SnapshotStatus::Offer(offer.status))
            .await?;
        self.notifier.notify(templates::offer_answered(&offer, &bid)).await?;

        if decision == Decision::Decline {
            return Ok(OfferResponse { offer, order: None });
        }

        bid.fulfil(now);
        self.bids.update_bid(bid.clone()).await?;

        let order = Order::from_offer(&offer, &bid, now);
        self.orders.insert(order.clone()).await?;
        metrics::counter!("orders.placed", "kind" => order.kind.as_str()).increment(1);
        info!(order_id = %order.id, %offer_id, "Order created from accepted offer");

        let order = self.engine.dispatch(OrderAction::Arm { order_id: order.id }).await?;
        Ok(OfferResponse {
            offer,
            order: Some(order),
        })
    }

    /// Accepted offers of `buyer`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn accepted_offers(&self, buyer: &AccountId) -> MarketResult<Vec<Offer>> {
        self.bids.accepted_offers_for(buyer).await
    }
}
