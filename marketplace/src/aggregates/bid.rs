//! Reverse bidding: buyers post bid requests, sellers answer with offers.
//!
//! ```text
//! Bid:   open ──(an offer accepted)──▶ fulfilled
//! Offer: pending ──accept──▶ accepted
//!           └──decline──▶ declined
//! ```
//!
//! Sibling offers on the same bid are left as they are when one is accepted.

use crate::error::{MarketError, MarketResult};
use crate::types::{AccountId, BidId, Decision, Money, OfferId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bid request status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    /// Taking offers
    Open,
    /// An offer was accepted
    Fulfilled,
}

/// Offer status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Waiting for the buyer
    Pending,
    /// Buyer accepted
    Accepted,
    /// Buyer declined
    Declined,
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        })
    }
}

/// A buyer asking sellers for a book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Bid id
    pub id: BidId,
    /// Requesting buyer
    pub buyer: AccountId,
    /// Book the buyer wants
    pub book_name: String,
    /// Free-form details
    pub comment: String,
    /// Current status
    pub status: BidStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Post a new open bid.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] if the book name or comment is blank.
    pub fn post(
        buyer: AccountId,
        book_name: &str,
        comment: &str,
        now: DateTime<Utc>,
    ) -> MarketResult<Self> {
        let book_name = book_name.trim();
        let comment = comment.trim();
        if book_name.is_empty() || comment.is_empty() {
            return Err(MarketError::Validation(
                "Book name and comment are required".to_string(),
            ));
        }

        Ok(Self {
            id: BidId::new(),
            buyer,
            book_name: book_name.to_string(),
            comment: comment.to_string(),
            status: BidStatus::Open,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the bid still takes offers
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == BidStatus::Open
    }

    /// Mark the bid fulfilled by an accepted offer
    pub fn fulfil(&mut self, now: DateTime<Utc>) {
        self.status = BidStatus::Fulfilled;
        self.updated_at = now;
    }
}

/// A seller's answer to a bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Offer id
    pub id: OfferId,
    /// Bid being answered
    pub bid: BidId,
    /// Offering seller
    pub seller: AccountId,
    /// Buyer who posted the bid
    pub buyer: AccountId,
    /// Asking price
    pub price: Money,
    /// Book condition as described by the seller
    pub condition: String,
    /// Optional note to the buyer
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Photo of the offered copy
    pub image_url: String,
    /// Current status
    pub status: OfferStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Seller-supplied offer details.
#[derive(Clone, Debug)]
pub struct OfferTerms {
    /// Asking price
    pub price: Money,
    /// Book condition
    pub condition: String,
    /// Optional note
    pub message: Option<String>,
}

impl Offer {
    /// Make a pending offer on an open bid.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidTransition`] if the bid is already fulfilled
    /// - [`MarketError::Validation`] if the condition is blank
    pub fn make(
        bid: &Bid,
        seller: AccountId,
        terms: OfferTerms,
        image_url: String,
        now: DateTime<Utc>,
    ) -> MarketResult<Self> {
        if !bid.is_open() {
            return Err(MarketError::InvalidTransition(format!(
                "Bid {} is no longer open",
                bid.id
            )));
        }
        let condition = terms.condition.trim();
        if condition.is_empty() {
            return Err(MarketError::Validation("Book condition is required".to_string()));
        }

        Ok(Self {
            id: OfferId::new(),
            bid: bid.id,
            seller,
            buyer: bid.buyer.clone(),
            price: terms.price,
            condition: condition.to_string(),
            message: terms
                .message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            image_url,
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the buyer's decision.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Forbidden`] if `responder` did not post the bid
    /// - [`MarketError::InvalidTransition`] if the offer was already answered
    pub fn answer(
        &mut self,
        decision: Decision,
        responder: &AccountId,
        now: DateTime<Utc>,
    ) -> MarketResult<()> {
        if &self.buyer != responder {
            return Err(MarketError::Forbidden(
                "Only the buyer who posted the bid can respond to its offers".to_string(),
            ));
        }
        if self.status != OfferStatus::Pending {
            return Err(MarketError::InvalidTransition(format!(
                "Offer {} is already {}",
                self.id, self.status
            )));
        }

        self.status = match decision {
            Decision::Accept => OfferStatus::Accepted,
            Decision::Decline => OfferStatus::Declined,
        };
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use librix_core::environment::Clock;
    use librix_testing::test_clock;

    fn terms() -> OfferTerms {
        OfferTerms {
            price: Money::from_rupees(250),
            condition: "like new".to_string(),
            message: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_post_requires_name_and_comment() {
        let now = test_clock().now();
        let buyer = AccountId::new("b1");

        assert!(matches!(
            Bid::post(buyer.clone(), "  ", "anything", now),
            Err(MarketError::Validation(_))
        ));
        assert!(matches!(
            Bid::post(buyer.clone(), "Dune", "", now),
            Err(MarketError::Validation(_))
        ));

        let bid = Bid::post(buyer, " Dune ", "paperback please", now).unwrap();
        assert_eq!(bid.book_name, "Dune");
        assert!(bid.is_open());
    }

    #[test]
    fn test_offer_on_fulfilled_bid_is_rejected() {
        let now = test_clock().now();
        let mut bid = Bid::post(AccountId::new("b1"), "Dune", "any", now).unwrap();
        bid.fulfil(now);

        let result = Offer::make(&bid, AccountId::new("s1"), terms(), "url".into(), now);
        assert!(matches!(result, Err(MarketError::InvalidTransition(_))));
    }

    #[test]
    fn test_offer_copies_buyer_and_drops_blank_message() {
        let now = test_clock().now();
        let bid = Bid::post(AccountId::new("b1"), "Dune", "any", now).unwrap();

        let offer = Offer::make(&bid, AccountId::new("s1"), terms(), "url".into(), now).unwrap();
        assert_eq!(offer.buyer, AccountId::new("b1"));
        assert_eq!(offer.message, None);
        assert_eq!(offer.status, OfferStatus::Pending);
    }

    #[test]
    fn test_answer_checks_owner_and_status() {
        let now = test_clock().now();
        let bid = Bid::post(AccountId::new("b1"), "Dune", "any", now).unwrap();
        let mut offer =
            Offer::make(&bid, AccountId::new("s1"), terms(), "url".into(), now).unwrap();

        let stranger = offer.answer(Decision::Accept, &AccountId::new("b2"), now);
        assert!(matches!(stranger, Err(MarketError::Forbidden(_))));

        offer.answer(Decision::Decline, &AccountId::new("b1"), now).unwrap();
        assert_eq!(offer.status, OfferStatus::Declined);

        let again = offer.answer(Decision::Accept, &AccountId::new("b1"), now);
        assert!(matches!(again, Err(MarketError::InvalidTransition(_))));
    }
}
