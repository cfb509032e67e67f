//! Domain aggregates.

pub mod bid;
pub mod listing;
pub mod order;
pub mod payment;

pub use bid::{Bid, BidStatus, Offer, OfferStatus, OfferTerms};
pub use listing::{Book, LendBook};
pub use order::{Order, OrderAction, OrderEnvironment, OrderReducer, OrderState, Outgoing};
pub use payment::{LendPayment, LendPaymentStatus};
