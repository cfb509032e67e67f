//! Domain types for the book marketplace.
//!
//! Identifiers, roles, money and the status enums shared by orders, bids,
//! offers and notifications.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an order (purchase, rental or bid-fulfilled)
    OrderId
);
uuid_id!(
    /// Unique identifier for a notification
    NotificationId
);
uuid_id!(
    /// Unique identifier for a book listed for sale
    BookId
);
uuid_id!(
    /// Unique identifier for a book listed for rent
    LendBookId
);
uuid_id!(
    /// Unique identifier for a buyer's bid request
    BidId
);
uuid_id!(
    /// Unique identifier for a seller's offer on a bid
    OfferId
);
uuid_id!(
    /// Unique identifier for a scheduled lifecycle job
    JobId
);
uuid_id!(
    /// Unique identifier for a lender payment record
    PaymentId
);

/// Account identity as carried in the token's `sub` claim.
///
/// Accounts live in the external identity service, so the id is kept opaque.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an identity string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Role an account acts in. Each role has its own token secret and room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys, rents and posts bids
    Buyer,
    /// Sells books and makes offers on bids
    Seller,
    /// Rents books out
    Lender,
}

impl Role {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Lender => "lender",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "lender" => Ok(Self::Lender),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// ============================================================================
// Money Value Object (paise-based to avoid floating point errors)
// ============================================================================

/// Rupee amount stored in paise.
///
/// On the wire it is a plain number of rupees (`300` or `149.5`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Creates a `Money` value from whole rupees, saturating on overflow
    #[must_use]
    pub const fn from_rupees(rupees: u64) -> Self {
        Self(rupees.saturating_mul(100))
    }

    /// Returns the amount in paise
    #[must_use]
    pub const fn paise(&self) -> u64 {
        self.0
    }

    /// Returns the amount in rupees (rounded down)
    #[must_use]
    pub const fn rupees(&self) -> u64 {
        self.0 / 100
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paise = self.0 % 100;
        if paise == 0 {
            write!(f, "₹{}", self.rupees())
        } else {
            write!(f, "₹{}.{paise:02}", self.rupees())
        }
    }
}

impl Serialize for Money {
    #[allow(clippy::cast_precision_loss)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u64(self.rupees())
        } else {
            serializer.serialize_f64(self.0 as f64 / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rupees = f64::deserialize(deserializer)?;
        Self::try_from_rupees_f64(rupees).map_err(serde::de::Error::custom)
    }
}

impl Money {
    /// Parse a rupee amount such as `149.5` coming from a form field.
    ///
    /// # Errors
    ///
    /// Returns a message if the value is negative, not finite or too large.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn try_from_rupees_f64(rupees: f64) -> Result<Self, String> {
        if !rupees.is_finite() || rupees < 0.0 {
            return Err(format!("invalid amount: {rupees}"));
        }
        let paise = (rupees * 100.0).round();
        if paise >= u64::MAX as f64 {
            return Err(format!("amount too large: {rupees}"));
        }
        Ok(Self(paise as u64))
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Order status. Purchase, rental and bid orders share one state machine:
///
/// ```text
/// pending ──accept──▶ accepted ──▶ out_for_delivery ──▶ delivered ──▶ returned (rental)
///    └──decline──▶ cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for the seller or lender
    Pending,
    /// Counterparty accepted; lifecycle armed
    Accepted,
    /// Dispatched and paid
    OutForDelivery,
    /// Delivered to the buyer
    Delivered,
    /// Rental handed back to the lender
    Returned,
    /// Declined by the counterparty
    Cancelled,
}

impl OrderStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment capture state, flipped when the order goes out for delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not captured yet
    Unpaid,
    /// Captured on dispatch
    Paid,
}

/// Which listing an order came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Direct purchase of a book for sale
    Purchase,
    /// Rental of a lend book
    Rental,
    /// Purchase created by accepting an offer on a bid
    Bid,
}

impl OrderKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Rental => "rental",
            Self::Bid => "bid",
        }
    }
}

/// The listing an order transacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ListingRef {
    /// Book for sale
    Book(BookId),
    /// Book for rent
    LendBook(LendBookId),
    /// Buyer bid that an offer fulfilled
    Bid(BidId),
}

impl ListingRef {
    /// The order kind this listing produces
    #[must_use]
    pub const fn kind(&self) -> OrderKind {
        match self {
            Self::Book(_) => OrderKind::Purchase,
            Self::LendBook(_) => OrderKind::Rental,
            Self::Bid(_) => OrderKind::Bid,
        }
    }
}

/// A counterparty's answer to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Go ahead
    Accept,
    /// Refuse
    Decline,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_rupees(300).to_string(), "₹300");
        assert_eq!(Money::from_paise(14_950).to_string(), "₹149.50");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
    }

    #[test]
    fn test_money_wire_format() {
        assert_eq!(serde_json::to_string(&Money::from_rupees(300)).unwrap(), "300");
        assert_eq!(serde_json::to_string(&Money::from_paise(14_950)).unwrap(), "149.5");

        let parsed: Money = serde_json::from_str("149.5").unwrap();
        assert_eq!(parsed, Money::from_paise(14_950));

        assert!(serde_json::from_str::<Money>("-1").is_err());
    }

    #[test]
    fn test_money_multiply_overflow() {
        assert_eq!(
            Money::from_rupees(50).checked_multiply(3),
            Some(Money::from_rupees(150))
        );
        assert_eq!(Money::from_paise(u64::MAX).checked_multiply(2), None);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert_eq!(serde_json::to_string(&Role::Lender).unwrap(), "\"lender\"");
        assert_eq!(serde_json::from_str::<Decision>("\"decline\"").unwrap(), Decision::Decline);
    }

    #[test]
    fn test_listing_ref_kind() {
        assert_eq!(ListingRef::Book(BookId::new()).kind(), OrderKind::Purchase);
        assert_eq!(ListingRef::LendBook(LendBookId::new()).kind(), OrderKind::Rental);
        assert_eq!(ListingRef::Bid(BidId::new()).kind(), OrderKind::Bid);
    }

    #[test]
    fn test_role_round_trip_from_str() {
        for role in [Role::Buyer, Role::Seller, Role::Lender] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }
}
