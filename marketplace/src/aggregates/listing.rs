//! Catalog listings the order aggregate transacts.
//!
//! Listing CRUD lives elsewhere; the marketplace only reads listings to find
//! the owner, the title snapshot and the price.

use crate::types::{AccountId, BookId, LendBookId, Money};
use serde::{Deserialize, Serialize};

/// A book listed for sale by a seller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Listing id
    pub id: BookId,
    /// Title shown in notifications
    pub title: String,
    /// Owning seller
    pub seller: AccountId,
    /// Sale price
    pub price: Money,
}

/// A book listed for rent by a lender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendBook {
    /// Listing id
    pub id: LendBookId,
    /// Title shown in notifications
    pub title: String,
    /// Owning lender
    pub lender: AccountId,
    /// Price charged per week of rental
    pub rent_price_per_week: Money,
}
